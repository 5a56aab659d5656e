use serde_json::json;
use uuid::Uuid;

use super::{open_session, print_json, CliResult};

pub fn run(space: Option<Uuid>) -> CliResult {
    let (controller, config) = open_session(space)?;
    let view = controller.view()?;

    let mut scoreboard = serde_json::to_value(&view.scoreboard)?;
    if !config.display.show_net_points {
        if let Some(obj) = scoreboard.as_object_mut() {
            obj.remove("netPoints");
        }
    }

    print_json(&json!({
        "spaceId": view.space.id,
        "name": view.space.name,
        "totalClockedInTime": view.space.total_clocked_in_time,
        "isClockedIn": view.is_clocked_in,
        "scoreboard": scoreboard,
    }))
}
