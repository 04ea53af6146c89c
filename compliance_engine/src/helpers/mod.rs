mod seller_locks;

pub use seller_locks::SellerLocks;
