//! Conversion between `Item` and DynamoDB attribute maps

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use dynalock_core::Item;

/// Every attribute is written as a string (`S`)
pub fn to_attribute_map(item: &Item) -> HashMap<String, AttributeValue> {
    item.iter()
        .map(|(name, value)| (name.clone(), AttributeValue::S(value.clone())))
        .collect()
}

/// Scalar attributes are kept as strings; sets, lists, maps and binaries are dropped
pub fn from_attribute_map(attributes: &HashMap<String, AttributeValue>) -> Item {
    attributes
        .iter()
        .filter_map(|(name, value)| {
            let value = match value {
                AttributeValue::S(s) => s.clone(),
                AttributeValue::N(n) => n.clone(),
                AttributeValue::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((name.clone(), value))
        })
        .collect()
}
