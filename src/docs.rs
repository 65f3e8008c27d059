use crate::api::attendance::{MarkReq, ScanReq, ToggleReq};
use crate::api::message::SendMessageReq;
use crate::api::staff::{CreateStaff, UserStatusRow};
use crate::ledger::{LedgerRow, MarkOutcome, Presence, RecordEdit, ToggleOutcome};
use crate::model::attendance::AttendanceRecord;
use crate::model::message::Message;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shop Attendance API",
        version = "1.0.0",
        description = r#"
## Shop Attendance System

Owner/staff attendance tracking for a small shop.

### 🔹 Key Features
- **QR check-in/check-out**
  - One badge scan toggles a staff member between checked in and out
- **Back-office corrections**
  - Day-level marking (including explicit Absent), record edit and delete
- **Reporting**
  - Date-filtered attendance queries and CSV export
- **Staff management & messages**
  - Owner-managed accounts, printable badge QR codes, staff notices

### 🔐 Security
Endpoints are protected with **JWT Bearer authentication**.
Back-office operations require the **owner** role.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::scan,
        crate::api::attendance::toggle,
        crate::api::attendance::mark,
        crate::api::attendance::edit,
        crate::api::attendance::delete,

        crate::api::report::list,
        crate::api::report::export,

        crate::api::staff::create_staff,
        crate::api::staff::list_staff,
        crate::api::staff::delete_staff,
        crate::api::staff::staff_qr,

        crate::api::message::send,

        crate::api::me::my_attendance,
        crate::api::me::my_status,
        crate::api::me::my_messages,
        crate::api::me::my_qr,
    ),
    components(
        schemas(
            ScanReq,
            ToggleReq,
            MarkReq,
            RecordEdit,
            SendMessageReq,
            CreateStaff,
            UserStatusRow,
            LedgerRow,
            AttendanceRecord,
            Message,
            ToggleOutcome,
            MarkOutcome,
            Presence
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in/check-out and corrections"),
        (name = "Reports", description = "Filtered queries and CSV export"),
        (name = "Staff", description = "Staff management APIs"),
        (name = "Messages", description = "Owner-to-staff notices"),
        (name = "Me", description = "Self-service for the logged-in user"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
