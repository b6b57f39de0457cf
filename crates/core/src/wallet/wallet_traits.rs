use async_trait::async_trait;

use super::wallet_model::PortfolioWalletBinding;
use crate::Result;

/// Trait defining the contract for wallet binding repository operations.
///
/// Implemented by the hosting application's storage layer. At most one
/// binding exists per portfolio; `set_binding` replaces any previous one.
#[async_trait]
pub trait WalletBindingRepositoryTrait: Send + Sync {
    async fn get_binding(&self, portfolio_id: &str) -> Result<Option<PortfolioWalletBinding>>;
    async fn set_binding(&self, binding: &PortfolioWalletBinding) -> Result<()>;
}
