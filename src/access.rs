use crate::error::ServiceError;
use crate::model::role::Role;

/// Everything a caller can ask the service to do.
#[derive(Debug, Copy, Clone, Eq, PartialEq, strum_macros::Display, strum_macros::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    ViewOwnRecords,
    ViewOwnStatus,
    ViewOwnMessages,
    ViewOwnQr,
    ToggleAttendance,
    MarkAttendance,
    EditAttendance,
    DeleteAttendance,
    QueryAttendance,
    ExportReport,
    CreateUser,
    DeleteUser,
    ViewUsers,
    ViewUserQr,
    SendMessage,
}

/// The capability table. Handlers consult it exactly once per request
/// instead of re-deriving role checks inline.
pub fn allowed_roles(op: Operation) -> &'static [Role] {
    use Operation::*;
    match op {
        ViewOwnRecords | ViewOwnStatus | ViewOwnMessages | ViewOwnQr => &[Role::Owner, Role::Staff],
        ToggleAttendance | MarkAttendance | EditAttendance | DeleteAttendance | QueryAttendance
        | ExportReport | CreateUser | DeleteUser | ViewUsers | ViewUserQr | SendMessage => {
            &[Role::Owner]
        }
    }
}

pub fn authorize(role: Role, op: Operation) -> Result<(), ServiceError> {
    if allowed_roles(op).contains(&role) {
        Ok(())
    } else {
        tracing::warn!(%op, %role, "operation denied");
        Err(ServiceError::AccessDenied)
    }
}
