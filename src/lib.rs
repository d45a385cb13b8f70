//! Horoscope page extraction for ehoroskop.net: decode, locate the daily,
//! weekly and monthly sections, format them, and optionally translate the
//! result through a text-generation service.

pub mod error;
pub mod model;
pub mod parsers;
pub mod services;
