pub mod pilot_access;
