pub mod export;
pub mod import;
pub mod kvm_keys;
pub mod purge;
