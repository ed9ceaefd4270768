//! Static GraphQL documents and the variable alignment around them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{AdapterError, Result};

/// Order creation mutation sent for every accepted webhook event.
pub const ORDER_CREATE_MUTATION: &str = r#"mutation CreateOrderFromPayment(
  $email: String!
  $firstName: String
  $lastName: String
  $totalPrice: Decimal!
  $currency: CurrencyCode!
  $productId: ID
  $quantity: Int!
  $sourceReference: String
) {
  orderCreate(
    order: {
      email: $email
      currency: $currency
      sourceIdentifier: $sourceReference
      customer: { toUpsert: { email: $email, firstName: $firstName, lastName: $lastName } }
      lineItems: [
        {
          productId: $productId
          quantity: $quantity
          priceSet: { shopMoney: { amount: $totalPrice, currencyCode: $currency } }
        }
      ]
      transactions: [
        {
          kind: SALE
          status: SUCCESS
          amountSet: { shopMoney: { amount: $totalPrice, currencyCode: $currency } }
        }
      ]
    }
  ) {
    order {
      id
      name
      email
      totalPriceSet {
        shopMoney {
          amount
          currencyCode
        }
      }
      lineItems(first: 10) {
        edges {
          node {
            id
            title
            quantity
          }
        }
      }
    }
    userErrors {
      field
      message
    }
  }
}"#;

pub const ORDER_CREATE_OPERATION_NAME: &str = "CreateOrderFromPayment";

/// Catalog query used when a GraphQL to REST caller supplies no query.
pub const PRODUCTS_QUERY: &str = r#"query SyncProducts($first: Int!) {
  products(first: $first) {
    edges {
      node {
        id
        title
        description
        variants(first: 1) {
          edges {
            node {
              price
            }
          }
        }
      }
    }
  }
}"#;

pub const PRODUCTS_QUERY_PAGE_SIZE: u64 = 50;

/// A declared `$name: Type` pair of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableDeclaration {
    pub name: &'static str,
    pub graphql_type: &'static str,
}

impl VariableDeclaration {
    const fn new(name: &'static str, graphql_type: &'static str) -> Self {
        Self { name, graphql_type }
    }

    pub fn is_required(&self) -> bool {
        self.graphql_type.ends_with('!')
    }
}

/// Declarations of [`ORDER_CREATE_MUTATION`], in document order.
pub const ORDER_CREATE_VARIABLES: [VariableDeclaration; 8] = [
    VariableDeclaration::new("email", "String!"),
    VariableDeclaration::new("firstName", "String"),
    VariableDeclaration::new("lastName", "String"),
    VariableDeclaration::new("totalPrice", "Decimal!"),
    VariableDeclaration::new("currency", "CurrencyCode!"),
    VariableDeclaration::new("productId", "ID"),
    VariableDeclaration::new("quantity", "Int!"),
    VariableDeclaration::new("sourceReference", "String"),
];

/// A ready-to-send GraphQL request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlOperation {
    pub query: String,
    pub variables: Value,
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
}

impl GraphqlOperation {
    pub fn new(query: impl Into<String>, variables: Value) -> Self {
        Self {
            query: query.into(),
            variables,
            operation_name: None,
        }
    }

    /// The caller's source query, or the default catalog query.
    pub fn source_query(query: Option<&str>, variables: Option<&Value>) -> Self {
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => Self::new(query, variables.cloned().unwrap_or_else(|| json!({}))),
            None => Self::new(
                PRODUCTS_QUERY,
                variables
                    .cloned()
                    .unwrap_or_else(|| json!({ "first": PRODUCTS_QUERY_PAGE_SIZE })),
            ),
        }
    }
}

pub struct MutationBuilder;

impl MutationBuilder {
    /// Align mapped variables with the order mutation's declarations.
    ///
    /// Required variables must be present and non-null. Keys the document
    /// does not declare are dropped.
    pub fn order_create(variables: &Value) -> Result<GraphqlOperation> {
        let provided = variables
            .as_object()
            .ok_or_else(|| AdapterError::validation("variables", "must be an object"))?;

        let mut aligned = Map::new();
        for declaration in ORDER_CREATE_VARIABLES.iter() {
            let value = provided.get(declaration.name).cloned().unwrap_or(Value::Null);
            if declaration.is_required() && value.is_null() {
                return Err(AdapterError::validation(
                    declaration.name,
                    format!("is required by the mutation as {}", declaration.graphql_type),
                ));
            }
            aligned.insert(declaration.name.to_string(), value);
        }

        for undeclared in provided
            .keys()
            .filter(|key| !ORDER_CREATE_VARIABLES.iter().any(|d| d.name == key.as_str()))
        {
            debug!(variable = %undeclared, "Dropping variable not declared by the mutation");
        }

        Ok(GraphqlOperation {
            query: ORDER_CREATE_MUTATION.to_string(),
            variables: Value::Object(aligned),
            operation_name: Some(ORDER_CREATE_OPERATION_NAME.to_string()),
        })
    }
}
