//! A small trading-bot tree written against [`crate::EXCHANGE_CONTRACT`].
//!
//! Each file carries one kind of divergence:
//! - `account.py`: unsigned request, mainnet URL in a testnet module
//! - `legacy.py`: endpoint the contract does not know
//! - `orders.py`: enum violation, API key logged in plain
//! - `streams.py`: duplicated subscription, unresolvable topic
//! - `ticker.py`: REST polling of a rate-limited streaming use case

pub const ACCOUNT_PY: &str = r#"# apx:env=testnet
BASE_URL = "https://api.exchange.io"


def balances(session, key):
    # read balances
    resp = session.get("/v3/account", headers={"X-Api-Key": key})
    return resp
"#;

pub const LEGACY_PY: &str = r#"def legacy_balances(session):
    # old balance endpoint
    return session.get("/v2/balances")
"#;

pub const ORDERS_PY: &str = r#"def place_order(session, symbol, api_key, sig):
    # submit a limit order
    resp = session.post("/v3/order", json={"symbol": symbol, "side": "HOLD"}, headers={"X-Api-Key": api_key, "X-Signature": sig})
    logger.info("order placed api_key=%s", api_key)
    return resp
"#;

pub const STREAMS_PY: &str = r#"def on_open(ws, symbol):
    # stream the order book
    ws.subscribe(f"orderBook.{symbol}")


def on_reconnect(ws, symbol):
    # stream the order book
    ws.subscribe(f"orderBook.{symbol}")


def on_channel(ws, channel, symbol):
    # generic channel fan-out
    ws.subscribe(f"{channel}.{symbol}")
"#;

pub const TICKER_PY: &str = r#"def poll_ticker(session, symbol):
    # poll the ticker
    resp = session.get("/v3/ticker", params={"symbol": symbol})
    return resp
"#;

/// `(path under bots/, text)` in path order.
pub const EXCHANGE_BOTS: &[(&str, &str)] = &[
    ("account.py", ACCOUNT_PY),
    ("legacy.py", LEGACY_PY),
    ("orders.py", ORDERS_PY),
    ("streams.py", STREAMS_PY),
    ("ticker.py", TICKER_PY),
];
