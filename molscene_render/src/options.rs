// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render option bags and their layering rules.

use alloc::collections::BTreeMap;
use alloc::string::String;

/// A single render option value.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    /// A boolean flag.
    Bool(bool),
    /// An integer value.
    Int(i64),
    /// A floating point value.
    Float(f64),
    /// Packed `0xRRGGBB` color.
    Color(u32),
    /// A text value.
    Text(String),
}

/// A named bag of render options.
///
/// Options layer: a caller-supplied (inherited) bag is overlaid by an
/// object's local options, which are overlaid by its overridden options.
/// Later layers win key by key; keys absent from a layer pass through.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOptions {
    entries: BTreeMap<String, OptionValue>,
}

impl RenderOptions {
    /// An empty option bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: OptionValue) {
        self.entries.insert(key.into(), value);
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: OptionValue) -> Self {
        self.set(key, value);
        self
    }

    /// The value of `key`, if set.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    /// The value of `key` as a bool, if set to one.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(OptionValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// The value of `key` as a float; ints read back as floats too.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.entries.get(key) {
            Some(OptionValue::Float(f)) => Some(*f),
            Some(OptionValue::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    /// The value of `key` as an integer, if set to one.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(OptionValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// The value of `key` as a packed color, if set to one.
    pub fn get_color(&self, key: &str) -> Option<u32> {
        match self.entries.get(key) {
            Some(OptionValue::Color(c)) => Some(*c),
            _ => None,
        }
    }

    /// The value of `key` as text, if set to one.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(OptionValue::Text(t)) => Some(t),
            _ => None,
        }
    }

    /// Overlays `over` onto `self`; keys present in `over` win.
    pub fn merge(&mut self, over: &Self) {
        for (k, v) in &over.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    /// Returns a copy of `self` with `over` layered on top.
    #[must_use]
    pub fn merged_with(&self, over: &Self) -> Self {
        let mut out = self.clone();
        out.merge(over);
        out
    }

    /// Whether the bag holds no options.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of options in the bag.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates the options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_win_key_by_key() {
        let inherited = RenderOptions::new()
            .with("bondColor", OptionValue::Color(0x0000FF))
            .with("bondWidth", OptionValue::Float(1.0))
            .with("showLabels", OptionValue::Bool(true));
        let local = RenderOptions::new().with("bondWidth", OptionValue::Float(2.5));
        let overridden = RenderOptions::new().with("bondColor", OptionValue::Color(0xFF0000));

        let merged = inherited.merged_with(&local).merged_with(&overridden);
        assert_eq!(merged.get_color("bondColor"), Some(0xFF0000));
        assert_eq!(merged.get_float("bondWidth"), Some(2.5));
        assert_eq!(merged.get_bool("showLabels"), Some(true));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn absent_keys_pass_through_unchanged() {
        let base = RenderOptions::new().with("fontSize", OptionValue::Float(12.0));
        let merged = base.merged_with(&RenderOptions::new());
        assert_eq!(merged, base);
    }

    #[test]
    fn int_options_read_back_as_floats() {
        let opts = RenderOptions::new().with("zoom", OptionValue::Int(3));
        assert_eq!(opts.get_float("zoom"), Some(3.0));
        assert_eq!(opts.get_int("zoom"), Some(3));
    }
}
