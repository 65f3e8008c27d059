#[derive(Debug, Copy, Clone, Eq, PartialEq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Owner = 1,
    Staff = 2,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Owner),
            2 => Some(Role::Staff),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}
