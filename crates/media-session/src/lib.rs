//! Platform collaborators for the now-playing tracker
//!
//! Media sessions are discovered over MPRIS (D-Bus) by shelling out to
//! `dbus-send`:
//! - [`MprisQuery`] answers playback state, metadata and owner queries
//! - [`MprisNotificationSource`] turns player appearance and changes into
//!   posted/removed notification events
//! - [`MprisPermissions`] reports whether the session bus is reachable
//! - [`PngArtworkEncoder`] encodes raw bitmaps to PNG

mod artwork;
mod mpris;

pub use artwork::PngArtworkEncoder;
pub use mpris::{
    parse_list_names, parse_metadata_reply, parse_variant_int, parse_variant_string, BusClient,
    DbusSend, MprisNotificationSource, MprisPermissions, MprisPlayer, MprisQuery,
};
