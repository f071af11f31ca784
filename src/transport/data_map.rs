use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key/value bundle carried by a data item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMap {
    assets: HashMap<String, Vec<u8>>,
    strings: HashMap<String, String>,
    string_lists: HashMap<String, Vec<String>>,
    int_lists: HashMap<String, Vec<i32>>,
}

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_asset(&mut self, key: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(key.into(), bytes);
    }

    pub fn asset(&self, key: &str) -> Option<&[u8]> {
        self.assets.get(key).map(Vec::as_slice)
    }

    pub fn take_asset(&mut self, key: &str) -> Option<Vec<u8>> {
        self.assets.remove(key)
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    pub fn strings(&self) -> &HashMap<String, String> {
        &self.strings
    }

    pub fn put_string_list(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.string_lists.insert(key.into(), values);
    }

    pub fn string_list(&self, key: &str) -> Option<&[String]> {
        self.string_lists.get(key).map(Vec::as_slice)
    }

    pub fn put_int_list(&mut self, key: impl Into<String>, values: Vec<i32>) {
        self.int_lists.insert(key.into(), values);
    }

    pub fn int_list(&self, key: &str) -> Option<&[i32]> {
        self.int_lists.get(key).map(Vec::as_slice)
    }

    /// Total asset bytes
    pub fn asset_len(&self) -> usize {
        self.assets.values().map(Vec::len).sum()
    }
}

/// Unit of data exchanged between the devices, addressed by path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    pub path: String,
    pub data: DataMap,
}

impl DataItem {
    pub fn new(path: impl Into<String>, data: DataMap) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Changed,
    Deleted,
}

/// Change notification surfaced on the receiving device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEvent {
    pub kind: EventKind,
    pub item: DataItem,
}

impl DataEvent {
    pub fn changed(item: DataItem) -> Self {
        Self {
            kind: EventKind::Changed,
            item,
        }
    }

    pub fn path(&self) -> &str {
        &self.item.path
    }
}
