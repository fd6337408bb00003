pub mod bucket_page;
pub mod directory_page;
pub mod extendible_hash_table;
pub mod hasher;
pub mod header_page;

pub use bucket_page::{HashBucketPage, HashBucketPageRef};
pub use directory_page::{HashDirectoryPage, HashDirectoryPageRef};
pub use extendible_hash_table::ExtendibleHashTable;
pub use hasher::{Fnv1aHasher, IdentityHasher, KeyHasher};
pub use header_page::{HashHeaderPage, HashHeaderPageRef};
