mod offer;

pub use offer::Offer;
