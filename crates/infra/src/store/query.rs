use catalog_core::{ProductId, SellerId};

/// Which products a listing should return.
///
/// Listings are ordered by creation time, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProductFilter {
    #[default]
    All,
    /// Only the listed ids; unknown ids are skipped.
    Ids(Vec<ProductId>),
    Seller(SellerId),
}

impl ProductFilter {
    pub fn matches(&self, id: ProductId, seller_id: SellerId) -> bool {
        match self {
            Self::All => true,
            Self::Ids(ids) => ids.contains(&id),
            Self::Seller(seller) => *seller == seller_id,
        }
    }
}
