use super::{ContactEmail, ContactName};

/// A validated message sent through the contact form.
/// Only constructed once the name and email have passed validation, and never
/// changed afterwards.
#[derive(Debug)]
pub struct ContactSubmission {
    pub name: ContactName,
    pub email: ContactEmail,
    pub message: String,
}
