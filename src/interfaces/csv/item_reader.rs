use crate::domain::item::Item;
use crate::error::{Result, ShopError};
use std::io::Read;

/// Reads catalog items from a CSV source with an
/// `id,name,description,price,currency` header.
///
/// Whitespace around fields is trimmed; negative prices and unknown
/// currencies surface as per-row errors.
pub struct ItemReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ItemReader<R> {
    /// Creates a new `ItemReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes items.
    pub fn items(self) -> impl Iterator<Item = Result<Item>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ShopError::from))
    }
}
