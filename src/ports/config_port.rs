//! Configuration access port trait.
//!
//! Values come back raw; parsing and range checks live in
//! [`config_validation`](crate::domain::config_validation).

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    fn sections(&self) -> Vec<String>;

    fn has_section(&self, section: &str) -> bool {
        self.sections().iter().any(|s| s == section)
    }
}
