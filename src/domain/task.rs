use super::order::OrderId;
use serde::{Deserialize, Serialize};

/// Work the reconciler hands to a task scheduler and gets back when due.
///
/// Serializable so an out-of-process queue can carry it as task arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum ScheduledTask {
    CheckPayment { order_id: OrderId, session_id: String },
    DisableCheck { order_id: OrderId },
}

/// Name of the recurring payment-status check for an order.
pub fn check_task_name(order_id: OrderId) -> String {
    format!("Payment status check for Order {order_id}")
}

/// Name of the one-shot task that stops the check once the order is paid.
pub fn disable_task_name(order_id: OrderId) -> String {
    format!("Disable payment status check for Order {order_id}")
}

/// Name of the one-shot task that stops the check when the session expires.
pub fn expiry_task_name(order_id: OrderId) -> String {
    format!("Expire payment status check for Order {order_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_args_json() {
        let task = ScheduledTask::CheckPayment {
            order_id: OrderId(4),
            session_id: "cs_test_4".to_string(),
        };
        let json = serde_json::to_string(&task).unwrap();
        assert_eq!(
            json,
            r#"{"task":"check_payment","order_id":4,"session_id":"cs_test_4"}"#
        );
    }

    #[test]
    fn test_task_names_are_distinct() {
        let id = OrderId(9);
        assert_eq!(check_task_name(id), "Payment status check for Order 9");
        assert_ne!(disable_task_name(id), expiry_task_name(id));
    }
}
