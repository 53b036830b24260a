// Adapters layer: concrete implementations of the domain ports (archive, storage, drawing).

pub mod fits;
pub mod mast;
pub mod plotting;
pub mod storage;
