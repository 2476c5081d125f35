//! Tables and JSON for listing commands.

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::error::{Result, VclError};
use crate::model::{Image, SessionSummary};

#[derive(Tabled)]
struct ImageRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "Session ID")]
    session_id: String,
    #[tabled(rename = "Image ID")]
    image_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "OS Type")]
    os_type: String,
    #[tabled(rename = "OS")]
    os: String,
}

pub fn images_table(images: &[Image]) -> String {
    let rows = images.iter().map(|i| ImageRow {
        id: i.id.clone(),
        name: i.name.clone(),
    });
    Table::new(rows).with(Style::psql()).to_string()
}

pub fn sessions_table(sessions: &[SessionSummary]) -> String {
    let rows = sessions.iter().map(|s| SessionRow {
        session_id: s.session_id.clone(),
        image_id: s.image_id.clone(),
        name: s.image_name.clone(),
        state: s.state.clone(),
        os_type: s.os_type.clone(),
        os: s.os.clone(),
    });
    Table::new(rows).with(Style::psql()).to_string()
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| VclError::Config(format!("failed to encode JSON: {}", e)))
}
