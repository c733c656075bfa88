//! Deterministic auto-selection of a simulator.
//!
//! Preference, most to least: an already-booted iPhone, the newest-runtime
//! iPhone (Pro before non-Pro, then by name), the first iPad, any booted
//! device, any device. Claimed devices and devices below the minimum runtime
//! are never candidates.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::device::{Device, DeviceClass, RuntimeVersion};

#[derive(Debug, Clone, Default)]
pub struct SelectionOptions {
    pub prefer_booted: bool,
    /// e.g. `iOS-17-0`
    pub minimum_runtime: Option<String>,
}

pub fn auto_select<'a>(
    candidates: &'a [Device],
    claimed: &HashSet<String>,
    options: &SelectionOptions,
) -> Option<&'a Device> {
    let minimum = options.minimum_runtime.as_deref().map(RuntimeVersion::parse);

    let available: Vec<&Device> = candidates
        .iter()
        .filter(|d| !claimed.contains(&d.udid))
        .filter(|d| minimum.map_or(true, |min| d.runtime() >= min))
        .collect();

    let mut phones: Vec<&Device> = available
        .iter()
        .copied()
        .filter(|d| d.class() == DeviceClass::Phone)
        .collect();
    phones.sort_by(|a, b| phone_preference(a, b));

    if options.prefer_booted {
        if let Some(booted) = phones.iter().find(|d| d.state.is_booted()) {
            return Some(*booted);
        }
    }

    if let Some(phone) = phones.first() {
        return Some(*phone);
    }

    if let Some(tablet) = available.iter().find(|d| d.class() == DeviceClass::Tablet) {
        return Some(*tablet);
    }

    if options.prefer_booted {
        if let Some(booted) = available.iter().find(|d| d.state.is_booted()) {
            return Some(*booted);
        }
    }

    available.first().copied()
}

/// Newer runtime first, then Pro before non-Pro, then name.
fn phone_preference(lhs: &Device, rhs: &Device) -> Ordering {
    rhs.runtime()
        .cmp(&lhs.runtime())
        .then_with(|| rhs.is_pro().cmp(&lhs.is_pro()))
        .then_with(|| lhs.name.cmp(&rhs.name))
}
