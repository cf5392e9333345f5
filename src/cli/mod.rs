pub mod wizard;

pub use wizard::CreateWizard;
