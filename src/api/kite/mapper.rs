use super::types::{KiteOrder, KiteProfile};
use crate::api::client::RawOrder;
use crate::models::{parse_datetime, BrokerProfile};

/// Map a Kite order to RawOrder
pub fn map_order_to_raw_order(order: &KiteOrder) -> Result<RawOrder, String> {
    let timestamp = match order.order_timestamp.as_deref() {
        Some(raw) => Some(
            parse_datetime(raw).ok_or_else(|| format!("Invalid order timestamp: {}", raw))?,
        ),
        None => None,
    };

    Ok(RawOrder {
        order_id: order.order_id.clone(),
        symbol: order.tradingsymbol.clone(),
        side: order.transaction_type.to_uppercase(),
        status: order.status.clone(),
        quantity: order.quantity,
        average_price: order.average_price,
        timestamp,
        fingerprint: generate_fingerprint(order),
    })
}

/// Kite order ids are unique per account, so the id alone identifies an import
pub fn generate_fingerprint(order: &KiteOrder) -> String {
    // Format: api|kite|{order_id}
    format!("api|kite|{}", order.order_id)
}

pub fn map_profile(profile: KiteProfile) -> BrokerProfile {
    BrokerProfile {
        user_id: profile.user_id,
        user_name: profile.user_name,
        email: profile.email,
        broker: profile.broker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::kite::types::KiteResponse;

    fn order(timestamp: Option<&str>) -> KiteOrder {
        KiteOrder {
            order_id: "240115000123456".to_string(),
            status: "COMPLETE".to_string(),
            tradingsymbol: "INFY".to_string(),
            exchange: Some("NSE".to_string()),
            transaction_type: "sell".to_string(),
            quantity: 10.0,
            average_price: 1520.5,
            order_timestamp: timestamp.map(str::to_string),
        }
    }

    #[test]
    fn test_map_order() {
        let raw = map_order_to_raw_order(&order(Some("2024-01-15 09:45:12"))).unwrap();
        assert_eq!(raw.symbol, "INFY");
        assert_eq!(raw.side, "SELL");
        assert_eq!(raw.quantity, 10.0);
        assert_eq!(raw.average_price, 1520.5);
        assert_eq!(raw.timestamp, parse_datetime("2024-01-15T09:45:12"));
        assert_eq!(raw.fingerprint, "api|kite|240115000123456");
        assert!(raw.is_complete());
    }

    #[test]
    fn test_missing_timestamp_is_kept_as_none() {
        let raw = map_order_to_raw_order(&order(None)).unwrap();
        assert!(raw.timestamp.is_none());
    }

    #[test]
    fn test_bad_timestamp_is_an_error() {
        assert!(map_order_to_raw_order(&order(Some("yesterday"))).is_err());
    }

    #[test]
    fn test_orders_envelope_parses_integer_quantities() {
        let body = r#"{
            "status": "success",
            "data": [{
                "order_id": "1",
                "status": "COMPLETE",
                "tradingsymbol": "TCS",
                "exchange": "NSE",
                "transaction_type": "BUY",
                "quantity": 5,
                "average_price": 3500,
                "order_timestamp": "2024-01-15 10:00:00",
                "variety": "regular"
            }]
        }"#;
        let parsed: KiteResponse<Vec<KiteOrder>> = serde_json::from_str(body).unwrap();
        let orders = parsed.data.unwrap();
        assert_eq!(orders[0].quantity, 5.0);
        assert_eq!(orders[0].average_price, 3500.0);
    }
}
