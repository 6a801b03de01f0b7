/// This module contains the snapshot database model.
pub mod snapshot;
