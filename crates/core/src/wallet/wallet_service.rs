//! Wallet binding service.

use std::sync::Arc;

use chrono::Utc;
use log::info;

use super::wallet_model::{PortfolioWalletBinding, WalletAddress};
use super::wallet_traits::WalletBindingRepositoryTrait;
use crate::dedup::DeduplicationIndex;
use crate::Result;

/// Manages the one-wallet-per-portfolio binding.
pub struct WalletService {
    repository: Arc<dyn WalletBindingRepositoryTrait>,
    dedup: Arc<DeduplicationIndex>,
}

impl WalletService {
    pub fn new(
        repository: Arc<dyn WalletBindingRepositoryTrait>,
        dedup: Arc<DeduplicationIndex>,
    ) -> Self {
        Self { repository, dedup }
    }

    /// Validate `address` and bind it to the portfolio.
    ///
    /// A changed binding means the portfolio's known-hash cache describes a
    /// different wallet's history, so the dedup cache for the portfolio is
    /// evicted in the same step.
    pub async fn set_wallet(
        &self,
        portfolio_id: &str,
        address: &str,
    ) -> Result<PortfolioWalletBinding> {
        let wallet_address = WalletAddress::parse(address)?;

        let binding = PortfolioWalletBinding {
            portfolio_id: portfolio_id.to_string(),
            wallet_address,
            updated_at: Utc::now(),
        };
        self.repository.set_binding(&binding).await?;

        let evicted = self.dedup.clear_portfolio(portfolio_id);
        info!(
            "Bound wallet {} to portfolio '{}', evicted {} cached dedup entries",
            binding.wallet_address, portfolio_id, evicted
        );

        Ok(binding)
    }

    /// The wallet currently bound to a portfolio, if any.
    pub async fn get_wallet(&self, portfolio_id: &str) -> Result<Option<PortfolioWalletBinding>> {
        self.repository.get_binding(portfolio_id).await
    }
}
