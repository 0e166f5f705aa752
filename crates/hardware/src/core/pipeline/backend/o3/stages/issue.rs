//! Issue (schedule): selects ready instructions out of the issue queue and
//! places them into their assigned lane's Register-Read slot.

use crate::core::pipeline::backend::o3::engine::O3Engine;

pub fn issue_stage(engine: &mut O3Engine) {
    let picked = engine.iq.select(engine.issue_width);
    for (lane, op) in picked {
        if lane < engine.lanes.lanes.len() && engine.lanes.lanes[lane].rr.is_none() {
            engine.lanes.lanes[lane].rr = Some(op);
        }
    }
}
