pub mod coinconvert;
pub mod in_memory;
