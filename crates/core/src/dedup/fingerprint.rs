//! Dedup fingerprint computation.
//!
//! Provider transaction hashes alone are not reliable identity: providers
//! re-serialize records as confirmations accumulate, and two providers may
//! describe the same event slightly differently. The fingerprint hashes
//! the transaction's rounding-stable semantic content instead; mutable
//! fields like confirmation counts never participate.

use sha2::{Digest, Sha256};

use rust_decimal::Decimal;
use walletfolio_chain_data::models::CanonicalTransaction;

/// Computes the stable dedup fingerprint for a transaction in a portfolio.
///
/// The fingerprint is a SHA-256 over:
/// - portfolio_id
/// - symbol
/// - timestamp (unix seconds)
/// - quantity (normalized)
/// - transaction_type
/// - exchange
/// - transaction_hash
///
/// Two transactions with the same fingerprint are the same event.
pub fn compute_fingerprint(tx: &CanonicalTransaction, portfolio_id: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(portfolio_id.as_bytes());
    hasher.update(b"|");
    hasher.update(tx.symbol.as_bytes());
    hasher.update(b"|");
    hasher.update(tx.timestamp.timestamp().to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_decimal(tx.quantity).as_bytes());
    hasher.update(b"|");
    hasher.update(tx.transaction_type.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(tx.exchange.as_bytes());
    hasher.update(b"|");
    hasher.update(tx.transaction_hash.as_bytes());

    hex::encode(hasher.finalize())
}

/// Normalize a decimal to a consistent string form.
/// `1.50000000` and `1.5` must hash identically.
fn normalize_decimal(d: Decimal) -> String {
    d.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use walletfolio_chain_data::models::TransactionType;

    fn sample_tx() -> CanonicalTransaction {
        CanonicalTransaction {
            transaction_hash: "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16"
                .to_string(),
            symbol: "BTC".to_string(),
            transaction_type: TransactionType::TransferIn,
            quantity: dec!(0.25),
            price_at_execution: None,
            total_amount: None,
            currency: "USD".to_string(),
            fee: None,
            fee_currency: None,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            exchange: "ESPLORA".to_string(),
            notes: None,
            raw_provider_payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let tx = sample_tx();
        let a = compute_fingerprint(&tx, "portfolio-1");
        let b = compute_fingerprint(&tx, "portfolio-1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // SHA-256 hex is 64 chars
    }

    #[test]
    fn test_fingerprint_sensitive_to_every_field() {
        let base = sample_tx();
        let base_fp = compute_fingerprint(&base, "portfolio-1");

        let mut changed = base.clone();
        changed.symbol = "LTC".to_string();
        assert_ne!(compute_fingerprint(&changed, "portfolio-1"), base_fp);

        let mut changed = base.clone();
        changed.timestamp = base.timestamp + chrono::Duration::seconds(1);
        assert_ne!(compute_fingerprint(&changed, "portfolio-1"), base_fp);

        let mut changed = base.clone();
        changed.quantity = dec!(0.26);
        assert_ne!(compute_fingerprint(&changed, "portfolio-1"), base_fp);

        let mut changed = base.clone();
        changed.transaction_type = TransactionType::TransferOut;
        assert_ne!(compute_fingerprint(&changed, "portfolio-1"), base_fp);

        let mut changed = base.clone();
        changed.exchange = "BLOCKCYPHER".to_string();
        assert_ne!(compute_fingerprint(&changed, "portfolio-1"), base_fp);

        let mut changed = base.clone();
        changed.transaction_hash = "other".to_string();
        assert_ne!(compute_fingerprint(&changed, "portfolio-1"), base_fp);
    }

    #[test]
    fn test_fingerprint_scoped_to_portfolio() {
        let tx = sample_tx();
        assert_ne!(
            compute_fingerprint(&tx, "portfolio-1"),
            compute_fingerprint(&tx, "portfolio-2")
        );
    }

    #[test]
    fn test_mutable_fields_do_not_participate() {
        let base = sample_tx();
        let base_fp = compute_fingerprint(&base, "portfolio-1");

        // A provider resync with a new confirmation count shows up as a
        // changed raw payload and a filled-in price; identity must hold
        let mut resynced = base.clone();
        resynced.raw_provider_payload = serde_json::json!({ "confirmations": 42 });
        resynced.price_at_execution = Some(dec!(65000));
        resynced.total_amount = Some(dec!(16250));
        resynced.notes = Some("resynced".to_string());

        assert_eq!(compute_fingerprint(&resynced, "portfolio-1"), base_fp);
    }

    #[test]
    fn test_quantity_scale_is_normalized() {
        let base = sample_tx();
        let mut rescaled = base.clone();
        rescaled.quantity = dec!(0.25000000);

        assert_eq!(
            compute_fingerprint(&base, "portfolio-1"),
            compute_fingerprint(&rescaled, "portfolio-1")
        );
    }
}
