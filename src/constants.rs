//! Fixed column and table names for the sales ledger model.
//!
//! The ledger schema is not configurable: every persisted table and every
//! join uses the names defined here.

// Source ledger columns (canonical spelling)
pub const CUSTOMER: &str = "Customer";
pub const PROJECT: &str = "Project";
pub const SM: &str = "SM";
pub const MONTH: &str = "Month";
pub const PO_REF: &str = "PO REF";
pub const ORDER_AMOUNT: &str = "Order Amount";
pub const REVENUE_AMOUNT: &str = "Revenue Amount";
pub const CASH_AMOUNT: &str = "Cash Amount";
pub const PENDING_AMOUNT: &str = "Pending Amount";
pub const BACKLOG_AMOUNT: &str = "Backlog Amount";
pub const REGION: &str = "Region";

/// Every column the source ledger must provide
pub const REQUIRED_COLUMNS: [&str; 11] = [
    CUSTOMER,
    PROJECT,
    SM,
    MONTH,
    PO_REF,
    ORDER_AMOUNT,
    REVENUE_AMOUNT,
    CASH_AMOUNT,
    PENDING_AMOUNT,
    BACKLOG_AMOUNT,
    REGION,
];

// Derived columns
pub const YEAR: &str = "Year";
pub const PERIOD: &str = "Period";

// Surrogate key columns
pub const CUSTOMER_ID: &str = "CustomerID";
pub const PROJECT_ID: &str = "ProjectID";
pub const SM_ID: &str = "SMID";
pub const DATE_ID: &str = "DateID";
pub const PO_REF_ID: &str = "PO REF ID";
pub const REGION_ID: &str = "Region_ID";

// Date dimension columns
pub const DATE: &str = "Date";
pub const QUARTER: &str = "Quarter";
pub const YEAR_MONTH: &str = "YearMonth";

// Synthetic fact identifiers
pub const ORDER_DATE_ID: &str = "OrderDateID";
pub const REVENUE_DATE_ID: &str = "RevenueDateID";
pub const CASH_DATE_ID: &str = "CashDateID";
pub const USER_ID: &str = "UserID";

/// First `UserID` of the revenue fact table
pub const REVENUE_ID_OFFSET: u32 = 1_336_346;
/// First `UserID` of the cash fact table
pub const CASH_ID_OFFSET: u32 = 2_000_000;

// Container table names
pub const CUSTOMER_DIM: &str = "Customer_Dim";
pub const PROJECT_DIM: &str = "Project_Dim";
pub const SM_DIM: &str = "SM_Dim";
pub const DATE_DIM: &str = "Date_Dim";
pub const PO_REF_DIM: &str = "PO_REF_Dim";
pub const REGION_DIM: &str = "Region_Dim";
pub const ORDERS_FACT: &str = "Orders_Fact";
pub const REVENUES_FACT: &str = "Revenues_Fact";
pub const CASH_FACT: &str = "Cash_Fact";

/// All tables in container order
pub const TABLE_NAMES: [&str; 9] = [
    CUSTOMER_DIM,
    PROJECT_DIM,
    SM_DIM,
    DATE_DIM,
    PO_REF_DIM,
    REGION_DIM,
    ORDERS_FACT,
    REVENUES_FACT,
    CASH_FACT,
];

/// File extension of each table entry inside the container
pub const TABLE_ENTRY_EXTENSION: &str = "parquet";

/// Natural key shared by the three fact tables
pub const JOIN_KEY_CANDIDATES: [&str; 6] = [CUSTOMER, PROJECT, MONTH, SM, PO_REF, REGION];

// Join suffixes
pub const ORDER_SUFFIX: &str = "_order";
pub const REVENUE_SUFFIX: &str = "_revenue";
pub const CASH_SUFFIX: &str = "_cash";

// Defaults
pub const DEFAULT_SOURCE_PATH: &str = "data from db.csv";
pub const DEFAULT_CONTAINER_PATH: &str = "ledger_model.zip";
pub const DEFAULT_MARKER_PATH: &str = "data_updated.txt";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 200;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_MISSING_SOURCE_DELAY_MS: u64 = 5_000;

/// Environment overrides
pub const ENV_SOURCE: &str = "LEDGER_SOURCE";
pub const ENV_CONTAINER: &str = "LEDGER_CONTAINER";
pub const ENV_MARKER: &str = "LEDGER_MARKER";

/// Container entry name for a table
pub fn table_entry_name(table: &str) -> String {
    format!("{}.{}", table, TABLE_ENTRY_EXTENSION)
}
