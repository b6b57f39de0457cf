//! Wallet addresses and portfolio/wallet bindings.

pub mod wallet_model;
pub mod wallet_service;
pub mod wallet_traits;

pub use wallet_model::{AddressKind, PortfolioWalletBinding, WalletAddress};
pub use wallet_service::WalletService;
pub use wallet_traits::WalletBindingRepositoryTrait;
