/// The name the sender introduced themselves with.
/// It can only be obtained through [`ContactName::parse`], so holders of a
/// `ContactName` know it is not blank.
#[derive(Debug, Clone)]
pub struct ContactName(String);

impl ContactName {
    /// Any non-blank text is accepted, the name is stored as given.
    pub fn parse(s: String) -> Result<Self, String> {
        if s.trim().is_empty() {
            return Err("Name must not be empty.".to_string());
        }

        Ok(Self(s))
    }
}

impl AsRef<str> for ContactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
