//! Staff role flags.

use serde::{Deserialize, Serialize};

/// Role flags of a staff member.
///
/// The flags are independent booleans: an identity may hold any
/// combination, including none. They are maintained by user management
/// and are read-only to the support desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoleFlags {
    pub is_admin: bool,
    pub is_manager: bool,
    pub is_superior_manager: bool,
}

impl RoleFlags {
    /// Admin without any hierarchy flag.
    #[must_use]
    pub const fn is_pure_admin(&self) -> bool {
        self.is_admin && !self.is_manager && !self.is_superior_manager
    }

    /// No role flag set at all.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        !self.is_admin && !self.is_manager && !self.is_superior_manager
    }
}
