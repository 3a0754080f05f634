use jobhub_core::models::EmailJob;

/// A rendered outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    pub subject: String,
    pub body: String,
}

/// Render the plain-text template for a job. Each event kind selects its
/// own subject and body shape; the send path is identical for all kinds.
pub fn render(job: &EmailJob) -> EmailTemplate {
    match job {
        EmailJob::VerifyEmail(p) => EmailTemplate {
            subject: "Confirm your email address".to_string(),
            body: format!(
                "Welcome to JobHub!\n\n\
                 Please confirm your email address by opening the link below:\n\n\
                 {}\n\n\
                 If you did not create an account, you can ignore this message.\n",
                p.link
            ),
        },
        EmailJob::ResetPassword(p) => EmailTemplate {
            subject: "Reset your password".to_string(),
            body: format!(
                "We received a request to reset the password for your JobHub account.\n\n\
                 Open the link below to choose a new password:\n\n\
                 {}\n\n\
                 If you did not request a reset, you can ignore this message.\n",
                p.link
            ),
        },
    }
}
