use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
}

impl OrderSide {
    pub fn as_kite_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_kite_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
}

impl OrderType {
    pub fn as_kite_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
        }
    }
}

/// Kite product code. `Cnc` is delivery (cash-and-carry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Cnc,
}

impl Product {
    pub fn as_kite_str(&self) -> &'static str {
        match self {
            Product::Cnc => "CNC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variety {
    Regular,
}

impl Variety {
    pub fn as_kite_str(&self) -> &'static str {
        match self {
            Variety::Regular => "regular",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub variety: Variety,
    pub exchange: String,
    pub tradingsymbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub product: Product,
    pub order_type: OrderType,
    pub tag: Option<String>,
}

impl OrderRequest {
    /// Market buy for delivery, the only order this bot ever sends.
    pub fn market_buy_cnc(exchange: &str, tradingsymbol: &str, quantity: u64) -> Self {
        Self {
            variety: Variety::Regular,
            exchange: exchange.to_string(),
            tradingsymbol: tradingsymbol.to_string(),
            side: OrderSide::Buy,
            quantity,
            product: Product::Cnc,
            order_type: OrderType::Market,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn form_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("exchange", self.exchange.clone()),
            ("tradingsymbol", self.tradingsymbol.clone()),
            ("transaction_type", self.side.as_kite_str().to_string()),
            ("quantity", self.quantity.to_string()),
            ("product", self.product.as_kite_str().to_string()),
            ("order_type", self.order_type.as_kite_str().to_string()),
            ("validity", "DAY".to_string()),
        ];
        if let Some(tag) = &self.tag {
            params.push(("tag", tag.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: String,
}

/// Kite order tags are at most 20 alphanumeric characters.
pub fn session_tag() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("dip{}", &id[..12])
}
