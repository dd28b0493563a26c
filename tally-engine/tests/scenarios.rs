//! End-to-end pipeline tests over realistic statement shapes.

use rust_decimal_macros::dec;
use tally_core::{CompiledProfile, DiagnosticKind, ExtractedTable, InstitutionProfile};
use tally_engine::{NormalizeOptions, normalize_statement};

fn spanish_bank() -> CompiledProfile {
    InstitutionProfile::from_toml(
        r#"
id = "riosur"
name = "Banco Rio Sur"
currency = "ARS"
separator_hint = "comma_decimal"
date_formats = ["%d/%m/%y", "%d/%m/%Y"]
metadata_patterns = ["hoja \\d+ de \\d+", "ante cualquier duda"]
debit_keywords = ["pago", "extraccion", "debito automatico", "compra"]
credit_keywords = ["deposito", "acreditacion", "haberes", "transferencia recibida"]

[headers]
date = ["fecha"]
description = ["concepto", "detalle"]
debit = ["debito"]
credit = ["credito"]
balance = ["saldo"]
reference = ["comprobante"]
"#,
    )
    .unwrap()
    .compile()
    .unwrap()
}

fn card_settlement() -> CompiledProfile {
    InstitutionProfile::from_toml(
        r#"
id = "cardpay"
name = "CardPay Settlements"
separator_hint = "comma_decimal"
date_formats = ["%d/%m/%y"]

[[sections]]
pattern = "VENTAS\\s+(VISA|MASTERCARD)"
role = "credits"

[[sections]]
pattern = "DESCUENTOS\\s+Y\\s+CARGOS"
role = "debits"

[totals]
pattern = "\\*TOTAL\\*"
mode = "replace"
"#,
    )
    .unwrap()
    .compile()
    .unwrap()
}

fn table(page: usize, index: usize, rows: Vec<Vec<&str>>) -> ExtractedTable {
    ExtractedTable::from_cells(
        page,
        index,
        rows.into_iter().map(|r| r.into_iter().map(|c| c.to_string()).collect()).collect(),
    )
}

#[test]
fn scenario_b_header_row_with_explicit_columns() {
    let p = spanish_bank();
    let t = table(
        0,
        0,
        vec![
            vec!["Fecha", "Concepto", "Débito", "Crédito", "Saldo"],
            vec!["01/09/25", "Pago", "100,00", "", "900,00"],
        ],
    );
    let out = normalize_statement(&[t], &p, &NormalizeOptions::default()).unwrap();

    assert_eq!(out.ledger.len(), 1);
    let tx = &out.ledger.transactions[0];
    assert_eq!(tx.debit.as_ref().unwrap().value, dec!(100.00));
    assert!(tx.credit.is_none());
    assert_eq!(tx.balance.as_ref().unwrap().value, dec!(900.00));
    assert!(out.tables[0].had_header);
}

#[test]
fn scenario_c_total_line_replaces_detail_amount() {
    let p = card_settlement();
    let t = table(
        0,
        0,
        vec![
            vec!["VENTAS VISA"],
            vec!["01/09/25", "CUPON 00412", "1.500,00"],
            vec!["*TOTAL* 62.028,96"],
        ],
    );
    let out = normalize_statement(&[t], &p, &NormalizeOptions::default()).unwrap();

    assert_eq!(out.ledger.len(), 1);
    let tx = &out.ledger.transactions[0];
    // Section forces credit; the totals line replaced, not summed.
    assert_eq!(tx.credit.as_ref().unwrap().value, dec!(62028.96));
    assert!(tx.debit.is_none());
}

#[test]
fn scenario_d_reconciliation_mismatch_detail() {
    let p = spanish_bank();
    let t = table(
        0,
        0,
        vec![
            vec!["Fecha", "Concepto", "Débito", "Crédito", "Saldo"],
            vec!["01/09/25", "Pago", "300,00", "", ""],
            vec!["02/09/25", "Deposito", "", "50,00", "760,00"],
        ],
    );
    let opts = NormalizeOptions { declared_opening: Some("1.000,00".into()), currency: None };
    let out = normalize_statement(&[t], &p, &opts).unwrap();

    let r = &out.report;
    assert_eq!(r.opening_balance, dec!(1000.00));
    assert_eq!(r.total_debits, dec!(300.00));
    assert_eq!(r.total_credits, dec!(50.00));
    assert_eq!(r.closing_balance, dec!(750.00));
    assert!(r.balance_mismatch);
    let m = r.mismatch.as_ref().unwrap();
    assert_eq!(m.difference, dec!(10.00));
    assert_eq!(m.recorded_closing, dec!(760.00));
}

#[test]
fn reconciliation_identity_holds_by_construction() {
    let p = spanish_bank();
    let t = table(
        0,
        0,
        vec![
            vec!["Fecha", "Concepto", "Débito", "Crédito", "Saldo"],
            vec!["01/09/25", "SALDO ANTERIOR", "", "", "1.000,00"],
            vec!["02/09/25", "Pago luz", "45,00", "", "955,00"],
            vec!["03/09/25", "Acreditacion haberes", "", "2.500,00", "3.455,00"],
            vec!["04/09/25", "Extraccion cajero", "500,00", "", "2.955,00"],
        ],
    );
    let out = normalize_statement(&[t], &p, &NormalizeOptions::default()).unwrap();
    let r = &out.report;
    assert_eq!(r.closing_balance, r.opening_balance - r.total_debits + r.total_credits);
    assert_eq!(r.opening_balance, dec!(1000.00));
    assert_eq!(r.closing_balance, dec!(2955.00));
    assert!(!r.balance_mismatch);
}

#[test]
fn pipeline_is_idempotent_byte_for_byte() {
    let p = spanish_bank();
    let tables = vec![
        table(
            0,
            0,
            vec![
                vec!["Fecha", "Concepto", "Débito", "Crédito", "Saldo"],
                vec!["01/09/25", "Pago servicio", "100,00", "", "900,00"],
                vec!["SEGUNDA LINEA DEL CONCEPTO"],
            ],
        ),
        table(1, 0, vec![vec!["02/09/25", "Deposito ventanilla", "", "50,00", "950,00"]]),
    ];
    let opts = NormalizeOptions { declared_opening: Some("1.000,00".into()), currency: Some("ARS".into()) };

    let a = normalize_statement(&tables, &p, &opts).unwrap();
    let b = normalize_statement(&tables, &p, &opts).unwrap();
    assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
}

#[test]
fn multiline_description_coalesced_across_rows() {
    let p = spanish_bank();
    let t = table(
        0,
        0,
        vec![
            vec!["Fecha", "Concepto", "Débito", "Crédito", "Saldo"],
            vec!["01/09/25", "TRANSFERENCIA RECIBIDA", "", "1.200,00", "2.200,00"],
            vec!["DE CUENTA 00123456 BANCO EXTERIOR"],
            vec!["Hoja 1 de 2"],
        ],
    );
    let out = normalize_statement(&[t], &p, &NormalizeOptions::default()).unwrap();
    assert_eq!(out.ledger.len(), 1);
    let tx = &out.ledger.transactions[0];
    assert_eq!(tx.description, "TRANSFERENCIA RECIBIDA DE CUENTA 00123456 BANCO EXTERIOR");
    assert_eq!(tx.credit.as_ref().unwrap().value, dec!(1200.00));
}

#[test]
fn duplicate_rows_across_overlapping_tables_deduplicated() {
    let p = spanish_bank();
    let header = vec!["Fecha", "Concepto", "Débito", "Crédito", "Saldo"];
    let row = vec!["01/09/25", "Pago luz", "45,00", "", "955,00"];
    let t0 = table(0, 0, vec![header.clone(), row.clone()]);
    let t1 = table(0, 1, vec![header, row]);
    let out = normalize_statement(&[t0, t1], &p, &NormalizeOptions::default()).unwrap();

    assert_eq!(out.ledger.len(), 1);
    assert_eq!(out.ledger.source_tables.len(), 2);
    assert!(out.diagnostics.iter().any(|d| d.kind == DiagnosticKind::DuplicateDropped));
}

#[test]
fn unparsable_amount_kept_as_diagnostic_never_fabricated() {
    let p = spanish_bank();
    let t = table(
        0,
        0,
        vec![
            vec!["Fecha", "Concepto", "Débito", "Crédito", "Saldo"],
            vec!["01/09/25", "Pago", "1O0,OO", "", "900,00"],
        ],
    );
    let out = normalize_statement(&[t], &p, &NormalizeOptions::default()).unwrap();

    let tx = &out.ledger.transactions[0];
    assert!(tx.debit.is_none(), "garbled token must not become a number");
    assert_eq!(tx.balance.as_ref().unwrap().value, dec!(900.00));
    assert!(
        out.tables[0].diagnostics.iter().any(|d| d.kind == DiagnosticKind::UnparsableAmount)
    );
}

#[test]
fn statement_with_no_usable_tables_fails_whole() {
    let p = spanish_bank();
    let t = table(0, 0, vec![vec!["Hoja 1 de 1"], vec!["ante cualquier duda consulte"]]);
    let err = normalize_statement(&[t], &p, &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, tally_core::NormalizeError::NoUsableTables));
}

#[test]
fn debit_credit_mutual_exclusion_over_varied_rows() {
    let p = spanish_bank();
    let t = table(
        0,
        0,
        vec![
            vec!["Fecha", "Concepto", "Débito", "Crédito", "Saldo"],
            vec!["01/09/25", "Pago A", "10,00", "", "990,00"],
            vec!["02/09/25", "Deposito B", "", "20,00", "1.010,00"],
            vec!["03/09/25", "Raro", "30,00", "40,00", "1.020,00"],
            vec!["04/09/25", "Compra kiosco", "5,00", "", "1.015,00"],
        ],
    );
    let out = normalize_statement(&[t], &p, &NormalizeOptions::default()).unwrap();
    for tx in &out.ledger.transactions {
        assert!(
            tx.debit.is_none() || tx.credit.is_none(),
            "debit and credit both set on `{}`",
            tx.description
        );
    }
}

#[test]
fn section_context_switches_between_markers() {
    let p = card_settlement();
    let t = table(
        0,
        0,
        vec![
            vec!["VENTAS MASTERCARD"],
            vec!["01/09/25", "CUPON 1", "100,00"],
            vec!["DESCUENTOS Y CARGOS"],
            vec!["01/09/25", "ARANCEL", "3,50"],
        ],
    );
    let out = normalize_statement(&[t], &p, &NormalizeOptions::default()).unwrap();
    assert_eq!(out.ledger.len(), 2);
    assert_eq!(out.ledger.transactions[0].credit.as_ref().unwrap().value, dec!(100.00));
    assert_eq!(out.ledger.transactions[1].debit.as_ref().unwrap().value, dec!(3.50));
}

#[test]
fn declared_opening_in_institution_format() {
    let p = spanish_bank();
    let t = table(
        0,
        0,
        vec![
            vec!["Fecha", "Concepto", "Débito", "Crédito", "Saldo"],
            vec!["01/09/25", "Pago", "100,00", "", ""],
        ],
    );
    let opts = NormalizeOptions { declared_opening: Some("1.234,56".into()), currency: None };
    let out = normalize_statement(&[t], &p, &opts).unwrap();
    assert_eq!(out.report.opening_balance, dec!(1234.56));
    assert_eq!(out.report.closing_balance, dec!(1134.56));

    let bad = NormalizeOptions { declared_opening: Some("abc".into()), currency: None };
    assert!(normalize_statement(
        &table_clone_helper(),
        &p,
        &bad
    )
    .is_err());
}

fn table_clone_helper() -> Vec<ExtractedTable> {
    vec![table(
        0,
        0,
        vec![
            vec!["Fecha", "Concepto", "Débito", "Crédito", "Saldo"],
            vec!["01/09/25", "Pago", "100,00", "", ""],
        ],
    )]
}

#[test]
fn currency_falls_back_to_profile_default() {
    let p = spanish_bank();
    let out = normalize_statement(&table_clone_helper(), &p, &NormalizeOptions::default()).unwrap();
    assert_eq!(out.currency.as_deref(), Some("ARS"));

    let opts = NormalizeOptions { declared_opening: None, currency: Some("USD".into()) };
    let out = normalize_statement(&table_clone_helper(), &p, &opts).unwrap();
    assert_eq!(out.currency.as_deref(), Some("USD"));
}
