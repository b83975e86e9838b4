//! Curated seed snippets per knowledge domain.

const BANKING: &[&str] = &[
    "AccountBalance: Monetary amount representing current account balance. Headers include balance, current_balance, acct_balance. Values are decimals, may include currency symbols.",
    "TransactionAmount: Positive or negative monetary value per transaction. Headers: amount, txn_amount, debit, credit. Values are decimals; negatives indicate debits.",
    "TransactionDate: ISO or locale date formats, headers: date, txn_date, posting_date, value_date.",
    "AccountType: Finite list: CHECKING, SAVINGS, MONEY MARKET, CREDIT CARD, LOAN.",
    "InterestRate: percentage values 0-100, headers: interest_rate, apr, annual_percentage_rate.",
    "LoanStatus: finite list: APPROVED, PENDING, REJECTED, CLOSED, DEFAULTED.",
    "CardType: finite list: VISA, MASTERCARD, AMEX, DISCOVER.",
    "ResolutionStatus: finite list for disputes: OPEN, IN_PROGRESS, RESOLVED, ESCALATED, CLOSED.",
    "BranchID: alphanumeric identifiers, headers: branch_id, branch_code.",
    "TransactionID: unique alphanumeric, headers: transaction_id, txn_id, reference, ref_id.",
    "AccountOpeningDate: date a bank account was opened, headers: open_date, opening_date.",
    "CreditLimit: monetary, headers: credit_limit, limit.",
    "AccountID: identifiers, headers: account_id, acct_id, account_number.",
];

/// Seed snippets for `domain`; empty for domains without curated knowledge.
pub fn seed_snippets(domain: &str) -> &'static [&'static str] {
    match domain {
        "banking" => BANKING,
        _ => &[],
    }
}
