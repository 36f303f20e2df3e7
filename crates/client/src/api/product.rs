//! Product version and license.

use erbind_core::Result;

use super::Resolver;

impl Resolver {
    /// Engine product version document.
    pub fn version(&self) -> Result<String> {
        self.call("version", |engine| engine.get_version())
    }

    /// Engine product license document.
    pub fn license(&self) -> Result<String> {
        self.call("license", |engine| engine.get_license())
    }
}
