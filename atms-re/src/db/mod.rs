//! Database access for atms-re
//!
//! One module per entity table. Query functions are generic over the
//! executor so the maintenance pass can run them inside its transaction
//! while read paths use the pool directly.

pub mod attendance;
pub mod sessions;
pub mod staff;
pub mod students;
pub mod subjects;
