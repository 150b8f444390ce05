use chrono::Utc;
use rand::Rng;

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const MOBILE_MONEY_PREFIX: &str = "CU";
pub const CASH_PREFIX: &str = "COD";

/// Random base36 suffix of `len` uppercase characters.
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// `<prefix>-<unix millis>-<6 base36 chars>`. Unique with high probability only;
/// the `transaction_ref` column carries a unique constraint as the backstop.
pub fn generate_transaction_ref(prefix: &str) -> String {
    format!(
        "{}-{}-{}",
        prefix,
        Utc::now().timestamp_millis(),
        random_base36(6)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_ref_shape() {
        let reference = generate_transaction_ref(MOBILE_MONEY_PREFIX);
        let parts: Vec<&str> = reference.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "CU");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 6);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_cash_prefix() {
        assert!(generate_transaction_ref(CASH_PREFIX).starts_with("COD-"));
    }

    #[test]
    fn test_consecutive_refs_differ() {
        let a = generate_transaction_ref(MOBILE_MONEY_PREFIX);
        let b = generate_transaction_ref(MOBILE_MONEY_PREFIX);
        assert_ne!(a, b);
    }
}
