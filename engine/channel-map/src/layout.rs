//! Static detector layout and cabling constants

/// Calorimeter racks and crates
pub const CALO_RACK_ID: u8 = 5;
pub const AUX_CALO_CRATE_ID: u8 = 2;

pub const MAIN_CALO_COLUMNS: u8 = 20;
pub const MAIN_CALO_ROWS: u8 = 13;

pub const XCALO_WALLS: u8 = 2;
pub const XCALO_COLUMNS: u8 = 2;
pub const XCALO_ROWS: u8 = 16;

pub const GVETO_WALLS: u8 = 2;
pub const GVETO_COLUMNS: u8 = 16;
/// First gamma-veto board in the auxiliary calorimeter crate
pub const GVETO_FIRST_BOARD: u8 = 11;

/// Tracker racks and crates
pub const TRACKER_RACK_ID: u8 = 3;
pub const TRACKER_CRATES: u8 = 3;
pub const TRACKER_LAYERS: u8 = 9;
pub const TRACKER_ROWS: u8 = 113;
pub const TRACKER_ROWS_PER_BOARD: u8 = 2;
pub const TRACKER_BOARDS_PER_CRATE: u8 = 19;

pub const NSIDES: u8 = 2;
pub const CALO_ZONES_PER_SIDE: usize = 10;

/// Board slots skip the crate control board (id 10).
#[inline]
pub fn board_id_of_slot(slot: u8) -> u8 {
    if slot < trigger_model::geiger_ctw::CONTROL_BOARD_ID {
        slot
    } else {
        slot + 1
    }
}
