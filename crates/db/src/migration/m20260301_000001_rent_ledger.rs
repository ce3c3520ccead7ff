//! Initial rent ledger schema.
//!
//! Creates contracts, escrow buckets, landlord wallets with their append-only
//! ledger, payment records, notifications, gateway bookkeeping and the
//! webhook event log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: CONTRACTS
        // ============================================================
        db.execute_unprepared(RENT_CONTRACTS_SQL).await?;

        // ============================================================
        // PART 2: ESCROW
        // ============================================================
        db.execute_unprepared(ESCROW_BALANCES_SQL).await?;

        // ============================================================
        // PART 3: WALLET LEDGER
        // ============================================================
        db.execute_unprepared(WALLET_BALANCES_SQL).await?;
        db.execute_unprepared(WALLET_TRANSACTIONS_SQL).await?;
        db.execute_unprepared(WALLET_IMMUTABILITY_SQL).await?;

        // ============================================================
        // PART 4: PAYMENTS
        // ============================================================
        db.execute_unprepared(PAYMENT_RECORDS_SQL).await?;

        // ============================================================
        // PART 5: NOTIFICATIONS
        // ============================================================
        db.execute_unprepared(NOTIFICATION_RECIPIENTS_SQL).await?;
        db.execute_unprepared(PAYMENT_NOTIFICATIONS_SQL).await?;

        // ============================================================
        // PART 6: GATEWAY BOOKKEEPING
        // ============================================================
        db.execute_unprepared(PAYMENT_AUTHORIZATIONS_SQL).await?;
        db.execute_unprepared(PAYOUT_ACCOUNTS_SQL).await?;
        db.execute_unprepared(WEBHOOK_EVENTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const RENT_CONTRACTS_SQL: &str = r"
CREATE TABLE rent_contracts (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    landlord_id UUID NOT NULL,
    property_id UUID NOT NULL,
    unit_id UUID NOT NULL,
    monthly_amount NUMERIC(19, 4) NOT NULL CHECK (monthly_amount > 0),
    expiry_date DATE NOT NULL,
    payout_type VARCHAR(16) NOT NULL CHECK (payout_type IN ('monthly', 'yearly')),
    next_payment_due DATE NOT NULL,
    transition_start_date DATE NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'expired', 'terminated')),
    is_existing_tenant BOOLEAN NOT NULL DEFAULT false,
    original_expiry_date DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_rent_contracts_due ON rent_contracts(next_payment_due) WHERE status = 'active';
CREATE INDEX idx_rent_contracts_expiry ON rent_contracts(expiry_date) WHERE status = 'active';
CREATE INDEX idx_rent_contracts_landlord ON rent_contracts(landlord_id);
";

const ESCROW_BALANCES_SQL: &str = r"
CREATE TABLE escrow_balances (
    id UUID PRIMARY KEY,
    landlord_id UUID NOT NULL,
    contract_id UUID NOT NULL REFERENCES rent_contracts(id),
    total_escrowed NUMERIC(19, 4) NOT NULL CHECK (total_escrowed >= 0),
    months_accumulated INTEGER NOT NULL CHECK (months_accumulated >= 0),
    expected_release_date DATE NOT NULL,
    is_released BOOLEAN NOT NULL DEFAULT false,
    released_at TIMESTAMPTZ,
    released_amount NUMERIC(19, 4),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_escrow_release_fields CHECK (
        (is_released AND released_at IS NOT NULL AND released_amount IS NOT NULL)
        OR (NOT is_released AND released_at IS NULL AND released_amount IS NULL)
    )
);

-- At most one open bucket per contract
CREATE UNIQUE INDEX uq_escrow_open_per_contract
    ON escrow_balances(contract_id) WHERE is_released = false;
CREATE INDEX idx_escrow_balances_contract ON escrow_balances(contract_id, created_at);
";

const WALLET_BALANCES_SQL: &str = r"
CREATE TABLE wallet_balances (
    landlord_id UUID PRIMARY KEY,
    available_balance NUMERIC(19, 4) NOT NULL DEFAULT 0 CHECK (available_balance >= 0),
    pending_balance NUMERIC(19, 4) NOT NULL DEFAULT 0 CHECK (pending_balance >= 0),
    total_earned NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_withdrawn NUMERIC(19, 4) NOT NULL DEFAULT 0,
    currency VARCHAR(3) NOT NULL,
    version BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const WALLET_TRANSACTIONS_SQL: &str = r"
CREATE TABLE wallet_transactions (
    id UUID PRIMARY KEY,
    landlord_id UUID NOT NULL REFERENCES wallet_balances(landlord_id),
    transaction_type VARCHAR(16) NOT NULL
        CHECK (transaction_type IN ('credit', 'debit', 'withdrawal', 'refund', 'fee')),
    amount NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    balance_before NUMERIC(19, 4) NOT NULL,
    balance_after NUMERIC(19, 4) NOT NULL,
    reference VARCHAR(255) NOT NULL UNIQUE,
    payment_id UUID,
    status VARCHAR(16) NOT NULL
        CHECK (status IN ('pending', 'completed', 'failed', 'cancelled')),
    description TEXT NOT NULL,
    metadata JSONB NOT NULL DEFAULT 'null',
    sequence BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_wallet_transactions_sequence UNIQUE (landlord_id, sequence)
);

CREATE INDEX idx_wallet_transactions_landlord ON wallet_transactions(landlord_id, sequence DESC);
CREATE INDEX idx_wallet_transactions_pending ON wallet_transactions(landlord_id)
    WHERE status = 'pending';
";

const WALLET_IMMUTABILITY_SQL: &str = r"
-- Ledger rows are append-only: only status and metadata may change
CREATE OR REPLACE FUNCTION prevent_wallet_transaction_rewrite()
RETURNS TRIGGER AS $$
BEGIN
    IF NEW.landlord_id <> OLD.landlord_id
        OR NEW.transaction_type <> OLD.transaction_type
        OR NEW.amount <> OLD.amount
        OR NEW.balance_before <> OLD.balance_before
        OR NEW.balance_after <> OLD.balance_after
        OR NEW.reference <> OLD.reference
        OR NEW.sequence <> OLD.sequence THEN
        RAISE EXCEPTION 'wallet transaction % is immutable', OLD.reference;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_wallet_transactions_immutable
    BEFORE UPDATE ON wallet_transactions
    FOR EACH ROW EXECUTE FUNCTION prevent_wallet_transaction_rewrite();

CREATE OR REPLACE FUNCTION prevent_wallet_transaction_delete()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'wallet transaction % cannot be deleted', OLD.reference;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_wallet_transactions_no_delete
    BEFORE DELETE ON wallet_transactions
    FOR EACH ROW EXECUTE FUNCTION prevent_wallet_transaction_delete();
";

const PAYMENT_RECORDS_SQL: &str = r"
CREATE TABLE payment_records (
    id UUID PRIMARY KEY,
    contract_id UUID NOT NULL REFERENCES rent_contracts(id),
    landlord_id UUID NOT NULL,
    tenant_id UUID NOT NULL,
    property_id UUID NOT NULL,
    unit_id UUID NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    amount_paid NUMERIC(19, 4) NOT NULL DEFAULT 0,
    due_date DATE NOT NULL,
    paid_date TIMESTAMPTZ,
    payment_type VARCHAR(32) NOT NULL DEFAULT 'rent',
    payment_method VARCHAR(16) NOT NULL
        CHECK (payment_method IN ('card', 'bank_transfer', 'ussd', 'mobile_money', 'other')),
    status VARCHAR(16) NOT NULL
        CHECK (status IN ('pending', 'partial', 'paid', 'overdue')),
    reference VARCHAR(255) NOT NULL UNIQUE,
    description TEXT NOT NULL,
    notes TEXT,
    wallet_transaction_id UUID REFERENCES wallet_transactions(id) DEFERRABLE INITIALLY DEFERRED,
    escrow_id UUID REFERENCES escrow_balances(id) DEFERRABLE INITIALLY DEFERRED,
    next_payment_due DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_payment_records_contract ON payment_records(contract_id, created_at);
";

const NOTIFICATION_RECIPIENTS_SQL: &str = r"
CREATE TABLE notification_recipients (
    user_id UUID PRIMARY KEY,
    display_name VARCHAR(255) NOT NULL,
    email VARCHAR(255),
    phone VARCHAR(32),
    push_token TEXT
);
";

const PAYMENT_NOTIFICATIONS_SQL: &str = r"
CREATE TABLE payment_notifications (
    id UUID PRIMARY KEY,
    contract_id UUID NOT NULL REFERENCES rent_contracts(id),
    tenant_id UUID NOT NULL,
    recipient_id UUID NOT NULL,
    notification_type VARCHAR(16) NOT NULL
        CHECK (notification_type IN ('reminder', 'overdue', 'success')),
    trigger_label VARCHAR(64) NOT NULL,
    scheduled_for DATE NOT NULL,
    sent_at TIMESTAMPTZ,
    title VARCHAR(255) NOT NULL,
    message TEXT NOT NULL,
    status VARCHAR(16) NOT NULL CHECK (status IN ('pending', 'sent', 'failed')),
    delivery_receipt_id VARCHAR(255),
    delivery_method VARCHAR(32),
    error TEXT,
    dedupe_key VARCHAR(255) NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_payment_notifications_contract ON payment_notifications(contract_id, created_at);
";

const PAYMENT_AUTHORIZATIONS_SQL: &str = r"
CREATE TABLE payment_authorizations (
    tenant_id UUID PRIMARY KEY,
    authorization_code VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL,
    card_type VARCHAR(32),
    last4 VARCHAR(4),
    bank VARCHAR(255),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const PAYOUT_ACCOUNTS_SQL: &str = r"
CREATE TABLE payout_accounts (
    landlord_id UUID PRIMARY KEY,
    account_number VARCHAR(32) NOT NULL,
    bank_code VARCHAR(16) NOT NULL,
    account_name VARCHAR(255) NOT NULL,
    recipient_code VARCHAR(255) NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const WEBHOOK_EVENTS_SQL: &str = r"
CREATE TABLE webhook_events (
    id UUID PRIMARY KEY,
    event VARCHAR(64) NOT NULL,
    reference VARCHAR(255) NOT NULL,
    payload JSONB NOT NULL,
    received_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_webhook_events_event_reference UNIQUE (event, reference)
);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS webhook_events CASCADE;
DROP TABLE IF EXISTS payout_accounts CASCADE;
DROP TABLE IF EXISTS payment_authorizations CASCADE;
DROP TABLE IF EXISTS payment_notifications CASCADE;
DROP TABLE IF EXISTS notification_recipients CASCADE;
DROP TABLE IF EXISTS payment_records CASCADE;
DROP TABLE IF EXISTS wallet_transactions CASCADE;
DROP TABLE IF EXISTS wallet_balances CASCADE;
DROP TABLE IF EXISTS escrow_balances CASCADE;
DROP TABLE IF EXISTS rent_contracts CASCADE;

DROP FUNCTION IF EXISTS prevent_wallet_transaction_rewrite() CASCADE;
DROP FUNCTION IF EXISTS prevent_wallet_transaction_delete() CASCADE;
";
