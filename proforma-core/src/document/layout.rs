//! Paginated quote document.
//!
//! A [`Document`] is assembled from a stored proforma, its customer and
//! advisor, the configuration and the recomputed totals. It holds one page
//! per line item; the header and footer bands repeat on every page, the
//! customer block appears on the first page only and the totals block on
//! the last page only. A quote without items still gets one page.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::format::{
    PAGE_WIDTH, format_money, format_percent, justify, truncate_text, wrap_text,
};
use crate::calculations::{CurrencyTotals, QuoteTotals};
use crate::config::{CompanyInfo, QuoteConfig};
use crate::models::{Advisor, Currency, Customer, EquipmentType, Proforma, ProformaItem};

const RULE: char = '=';
const THIN_RULE: char = '-';
const PAGE_BREAK: &str = "\u{c}\n";

/// Everything needed to lay out one quote.
#[derive(Debug, Clone, Copy)]
pub struct DocumentSource<'a> {
    pub proforma: &'a Proforma,
    pub customer: &'a Customer,
    pub advisor: Option<&'a Advisor>,
    pub config: &'a QuoteConfig,
    pub totals: &'a QuoteTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderBand {
    pub company: CompanyInfo,
    pub number: String,
    pub date: NaiveDate,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerBlock {
    pub name: String,
    pub company: String,
    pub attention: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisorBlock {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FooterBand {
    pub validity_days: u32,
    pub valid_until: NaiveDate,
    pub advisor: Option<AdvisorBlock>,
    pub terms: String,
    pub fiscal_note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemBlock {
    pub quantity: u32,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub tax_rate: Decimal,
    pub line_total: Decimal,
    pub currency: Currency,
    pub description: String,
    pub image_path: String,
}

impl From<&ProformaItem> for ItemBlock {
    fn from(item: &ProformaItem) -> Self {
        Self {
            quantity: item.quantity,
            brand: item.brand_name.clone(),
            model: item.model_name.clone(),
            year: item.year,
            unit_price: item.unit_price,
            discount_percent: item.discount_percent,
            tax_rate: item.tax_rate,
            line_total: item.line_total,
            currency: item.currency,
            description: item.description.clone(),
            image_path: item.image_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// 1-based.
    pub number: usize,
    pub customer: Option<CustomerBlock>,
    pub item: Option<ItemBlock>,
    pub show_totals: bool,
}

/// One line of the totals block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TotalsLine {
    /// Currency heading of a multi-currency block.
    Heading(Currency),
    Amount { label: String, value: String },
    Total { label: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub template: EquipmentType,
    pub header: HeaderBand,
    pub footer: FooterBand,
    pub pages: Vec<Page>,
    pub totals: QuoteTotals,
}

impl Document {
    pub fn build(source: DocumentSource<'_>) -> Self {
        let DocumentSource {
            proforma,
            customer,
            advisor,
            config,
            totals,
        } = source;

        let header = HeaderBand {
            company: config.company.clone(),
            number: proforma.number.clone(),
            date: proforma.date,
            title: proforma.template.title().to_string(),
        };

        let footer = FooterBand {
            validity_days: proforma.validity_days,
            valid_until: proforma.valid_until(),
            advisor: advisor.map(|a| AdvisorBlock {
                name: a.name.clone(),
                phone: a.phone.clone(),
                email: a.email.clone(),
            }),
            terms: non_empty_or(&proforma.custom_terms, config.terms_for(proforma.template)),
            fiscal_note: non_empty_or(&proforma.custom_fiscal_note, &config.fiscal_note),
        };

        let customer_block = CustomerBlock {
            name: customer.name.clone(),
            company: customer.company.clone(),
            attention: proforma.customer_attention.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
        };

        let items: Vec<Option<ItemBlock>> = if proforma.items.is_empty() {
            vec![None]
        } else {
            proforma.items.iter().map(|i| Some(ItemBlock::from(i))).collect()
        };
        let page_count = items.len();

        let pages = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| Page {
                number: idx + 1,
                customer: (idx == 0).then(|| customer_block.clone()),
                item,
                show_totals: idx + 1 == page_count,
            })
            .collect();

        Self {
            template: proforma.template,
            header,
            footer,
            pages,
            totals: totals.clone(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Lines of the totals block.
    ///
    /// A single-currency quote gets one block; a multi-currency quote gets
    /// one block per currency, in currency-code order. The discount line is
    /// omitted when there is no discount.
    pub fn totals_lines(&self) -> Vec<TotalsLine> {
        match &self.totals {
            QuoteTotals::Single { currency, totals } => {
                currency_block(currency.unwrap_or_default(), totals, "TOTAL:")
            }
            QuoteTotals::PerCurrency(groups) => groups
                .iter()
                .flat_map(|(currency, totals)| {
                    std::iter::once(TotalsLine::Heading(*currency))
                        .chain(currency_block(*currency, totals, "Total:"))
                })
                .collect(),
        }
    }

    /// Renders the document as fixed-width text, pages separated by a form
    /// feed.
    pub fn render_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| self.render_page(page).join("\n"))
            .collect::<Vec<_>>()
            .join(&format!("\n{PAGE_BREAK}"))
            + "\n"
    }

    fn render_page(
        &self,
        page: &Page,
    ) -> Vec<String> {
        let mut out = Vec::new();
        self.render_header(&mut out);
        if let Some(customer) = &page.customer {
            render_customer(customer, &mut out);
        }
        match &page.item {
            Some(item) => render_item(self.template, item, &mut out),
            None => out.push("(Sin productos)".to_string()),
        }
        self.render_footer(page.show_totals, &mut out);
        out.push(justify(
            "",
            &format!("Página {} de {}", page.number, self.page_count()),
            PAGE_WIDTH,
        ));
        out
    }

    fn render_header(
        &self,
        out: &mut Vec<String>,
    ) {
        let h = &self.header;
        out.push(rule(RULE));
        out.push(justify(
            &truncate_text(&h.company.name, 60),
            &format!("Fecha: {}", h.date.format("%Y-%m-%d")),
            PAGE_WIDTH,
        ));
        let number = format!("Cotización N°: {}", h.number);
        let room = PAGE_WIDTH.saturating_sub(number.chars().count() + 1);
        out.push(justify(
            &truncate_text(&h.company.address, room.min(150)),
            &number,
            PAGE_WIDTH,
        ));

        let contacts: Vec<String> = [
            non_blank(&h.company.phone).map(|p| format!("Tel: {}", truncate_text(p, 30))),
            non_blank(&h.company.email).map(|e| truncate_text(e, 50)),
            non_blank(&h.company.web).map(|w| truncate_text(w, 50)),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !contacts.is_empty() {
            out.push(contacts.join(" | "));
        }

        out.push(rule(THIN_RULE));
        out.push(center(&h.title));
        out.push(rule(THIN_RULE));
    }

    fn render_footer(
        &self,
        show_totals: bool,
        out: &mut Vec<String>,
    ) {
        let f = &self.footer;
        out.push(rule(THIN_RULE));
        out.push(format!(
            "VIGENCIA: {} días (hasta {})",
            f.validity_days,
            f.valid_until.format("%Y-%m-%d")
        ));

        if let Some(advisor) = &f.advisor {
            let parts: Vec<String> = [
                non_blank(&advisor.name).map(|n| truncate_text(n, 28)),
                non_blank(&advisor.phone).map(|p| format!("Tel: {}", truncate_text(p, 20))),
                non_blank(&advisor.email).map(|e| truncate_text(e, 28)),
            ]
            .into_iter()
            .flatten()
            .collect();
            labelled("ASESOR:", &parts, out);
        }

        if !f.terms.trim().is_empty() {
            out.push("CONDICIONES".to_string());
            out.extend(wrap_text(&truncate_text(&f.terms, 500), PAGE_WIDTH));
        }
        if !f.fiscal_note.trim().is_empty() {
            out.push("NOTA FISCAL".to_string());
            out.extend(wrap_text(&truncate_text(&f.fiscal_note, 250), PAGE_WIDTH));
        }

        if show_totals {
            out.push(rule(THIN_RULE));
            out.push("TOTALES".to_string());
            for line in self.totals_lines() {
                out.push(match line {
                    TotalsLine::Heading(currency) => format!("{currency}:"),
                    TotalsLine::Amount { label, value } => {
                        justify(&format!("  {label}"), &value, TOTALS_WIDTH)
                    }
                    TotalsLine::Total { label, value } => justify(&label, &value, TOTALS_WIDTH),
                });
            }
        }
        out.push(rule(RULE));
    }
}

const TOTALS_WIDTH: usize = 40;

fn currency_block(
    currency: Currency,
    totals: &CurrencyTotals,
    total_label: &str,
) -> Vec<TotalsLine> {
    let amount = |label: &str, value: Decimal| TotalsLine::Amount {
        label: label.to_string(),
        value: format_money(value, currency),
    };

    let mut lines = vec![amount("Subtotal:", totals.subtotal)];
    if totals.discount > Decimal::ZERO {
        lines.push(amount("Descuento:", totals.discount));
    }
    lines.push(amount(&format!("IVA {}:", totals.tax_rate), totals.tax));
    lines.push(TotalsLine::Total {
        label: total_label.to_string(),
        value: format_money(totals.total, currency),
    });
    lines
}

fn render_customer(
    customer: &CustomerBlock,
    out: &mut Vec<String>,
) {
    let parts: Vec<String> = [
        non_blank(&customer.name).map(|n| truncate_text(n, 40)),
        non_blank(&customer.company).map(|c| format!("({})", truncate_text(c, 35))),
        non_blank(&customer.attention).map(|a| format!("Att: {}", truncate_text(a, 30))),
        non_blank(&customer.email).map(|e| truncate_text(e, 35)),
        non_blank(&customer.phone).map(|p| format!("Tel: {}", truncate_text(p, 20))),
        non_blank(&customer.address).map(|a| truncate_text(a, 60)),
    ]
    .into_iter()
    .flatten()
    .collect();

    labelled("CLIENTE:", &parts, out);
    out.push(rule(THIN_RULE));
}

/// Writes `label` followed by `parts` joined with `|`, wrapped under the
/// label.
fn labelled(
    label: &str,
    parts: &[String],
    out: &mut Vec<String>,
) {
    let indent = label.chars().count() + 1;
    let lines = wrap_text(&parts.join(" | "), PAGE_WIDTH - indent);
    if lines.is_empty() {
        out.push(label.to_string());
        return;
    }
    for (i, line) in lines.into_iter().enumerate() {
        if i == 0 {
            out.push(format!("{label} {line}"));
        } else {
            out.push(format!("{}{line}", " ".repeat(indent)));
        }
    }
}

fn render_item(
    template: EquipmentType,
    item: &ItemBlock,
    out: &mut Vec<String>,
) {
    let discount = if item.discount_percent > Decimal::ZERO {
        format!("{:.1}%", item.discount_percent)
    } else {
        "-".to_string()
    };
    let unit_price = format_money(item.unit_price, item.currency);
    let line_total = format_money(item.line_total, item.currency);
    let tax = format_percent(item.tax_rate);

    match template {
        EquipmentType::Tractor => {
            out.push(format!(
                "{:<5} {:<12} {:<15} {:<4} {:>15} {:>6} {:>4} {:>15}",
                "CANT.", "MARCA", "MODELO", "AÑO", "P. UNIT", "DESC%", "IVA%", "TOTAL"
            ));
            out.push(format!(
                "{:<5} {:<12} {:<15} {:<4} {:>15} {:>6} {:>4} {:>15}",
                item.quantity,
                truncate_text(&item.brand, 12),
                truncate_text(&item.model, 15),
                item.year.map(|y| y.to_string()).unwrap_or_default(),
                unit_price,
                discount,
                tax,
                line_total,
            ));
        }
        EquipmentType::Implement => {
            out.push(format!(
                "{:<5} {:<16} {:<18} {:>15} {:>6} {:>4} {:>15}",
                "CANT.", "MARCA", "MODELO", "P. UNIT", "DESC%", "IVA%", "TOTAL"
            ));
            out.push(format!(
                "{:<5} {:<16} {:<18} {:>15} {:>6} {:>4} {:>15}",
                item.quantity,
                truncate_text(&item.brand, 16),
                truncate_text(&item.model, 18),
                unit_price,
                discount,
                tax,
                line_total,
            ));
        }
    }

    out.push(String::new());
    out.push("Especificaciones Técnicas".to_string());
    out.extend(wrap_text(&truncate_text(&item.description, 1000), PAGE_WIDTH));
    out.push(match non_blank(&item.image_path) {
        Some(path) => format!("Imagen: {}", truncate_text(path, PAGE_WIDTH - 8)),
        None => "(Sin imagen)".to_string(),
    });
}

fn non_empty_or(
    custom: &str,
    fallback: &str,
) -> String {
    match non_blank(custom) {
        Some(_) => custom.to_string(),
        None => fallback.to_string(),
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn rule(ch: char) -> String {
    ch.to_string().repeat(PAGE_WIDTH)
}

fn center(text: &str) -> String {
    let len = text.chars().count();
    let pad = PAGE_WIDTH.saturating_sub(len) / 2;
    format!("{}{text}", " ".repeat(pad))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::{LineItem, TotalsEngine};
    use crate::models::QuoteCurrency;

    fn item(
        id: i64,
        model: &str,
        price: Decimal,
        currency: Currency,
    ) -> ProformaItem {
        let totals = TotalsEngine::default()
            .line_totals(&LineItem::new(1, price, currency))
            .unwrap();
        ProformaItem {
            id,
            proforma_id: 1,
            model_id: None,
            brand_name: "Kuhn".to_string(),
            model_name: model.to_string(),
            year: Some(2024),
            description: "Rastra de discos".to_string(),
            image_path: String::new(),
            quantity: 1,
            unit_price: price,
            discount_percent: Decimal::ZERO,
            discount_amount: totals.discount_amount,
            line_subtotal: totals.line_subtotal,
            tax_rate: totals.tax_rate,
            line_tax: totals.line_tax,
            line_total: totals.line_total,
            currency,
        }
    }

    fn proforma(items: Vec<ProformaItem>) -> Proforma {
        Proforma {
            id: 1,
            number: "PF-20250110-090000".to_string(),
            customer_id: 1,
            advisor_id: Some(1),
            customer_attention: "Ing. Mora".to_string(),
            template: EquipmentType::Implement,
            validity_days: 15,
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            currency: QuoteCurrency::default(),
            subtotal: Decimal::ZERO,
            discount: Decimal::ZERO,
            net_subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            custom_terms: String::new(),
            custom_fiscal_note: String::new(),
            notes: String::new(),
            document_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            items,
        }
    }

    fn customer() -> Customer {
        Customer {
            id: 1,
            name: "Finca La Esperanza".to_string(),
            company: "Agrícola Esperanza S.A.".to_string(),
            email: "compras@esperanza.cr".to_string(),
            phone: "2710-0000".to_string(),
            address: "Guácimo".to_string(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn build(
        proforma: &Proforma,
        config: &QuoteConfig,
    ) -> Document {
        let totals = config.engine().quote_totals(&proforma.line_items()).unwrap();
        Document::build(DocumentSource {
            proforma,
            customer: &customer(),
            advisor: None,
            config,
            totals: &totals,
        })
    }

    #[test]
    fn one_page_per_item_with_customer_first_and_totals_last() {
        let p = proforma(vec![
            item(1, "BD-300", dec!(1000), Currency::Crc),
            item(2, "BD-400", dec!(2000), Currency::Crc),
            item(3, "BD-500", dec!(3000), Currency::Crc),
        ]);

        let doc = build(&p, &QuoteConfig::default());

        assert_eq!(doc.page_count(), 3);
        assert!(doc.pages[0].customer.is_some());
        assert!(doc.pages[1].customer.is_none());
        assert_eq!(
            doc.pages.iter().map(|p| p.show_totals).collect::<Vec<_>>(),
            vec![false, false, true]
        );
    }

    #[test]
    fn empty_quote_renders_single_page() {
        let doc = build(&proforma(Vec::new()), &QuoteConfig::default());

        assert_eq!(doc.page_count(), 1);
        let page = &doc.pages[0];
        assert!(page.customer.is_some());
        assert!(page.item.is_none());
        assert!(page.show_totals);
        assert!(doc.render_text().contains("Subtotal:"));
    }

    #[test]
    fn custom_terms_override_template_terms() {
        let config = QuoteConfig::default();
        let mut p = proforma(Vec::new());

        assert_eq!(build(&p, &config).footer.terms, config.terms_implement);

        p.custom_terms = "Entrega en 30 días".to_string();
        p.custom_fiscal_note = "   ".to_string();
        let doc = build(&p, &config);

        assert_eq!(doc.footer.terms, "Entrega en 30 días");
        assert_eq!(doc.footer.fiscal_note, config.fiscal_note);
    }

    #[test]
    fn single_currency_totals_lines() {
        let p = proforma(vec![
            item(1, "A", dec!(1000), Currency::Crc),
            item(2, "B", dec!(1000), Currency::Crc),
        ]);

        let lines = build(&p, &QuoteConfig::default()).totals_lines();

        assert_eq!(
            lines,
            vec![
                TotalsLine::Amount {
                    label: "Subtotal:".to_string(),
                    value: "₡2,000.00".to_string()
                },
                TotalsLine::Amount {
                    label: "IVA 13%:".to_string(),
                    value: "₡260.00".to_string()
                },
                TotalsLine::Total {
                    label: "TOTAL:".to_string(),
                    value: "₡2,260.00".to_string()
                },
            ]
        );
    }

    #[test]
    fn mixed_rate_label() {
        let mut zero_rated = item(2, "B", dec!(1000), Currency::Crc);
        zero_rated.tax_rate = Decimal::ZERO;
        let p = proforma(vec![item(1, "A", dec!(1000), Currency::Crc), zero_rated]);

        let text = build(&p, &QuoteConfig::default()).render_text();

        assert!(text.contains("IVA mixed:"));
    }

    #[test]
    fn multi_currency_blocks_in_code_order() {
        let p = proforma(vec![
            item(1, "A", dec!(100), Currency::Usd),
            item(2, "B", dec!(1000), Currency::Crc),
        ]);

        let lines = build(&p, &QuoteConfig::default()).totals_lines();
        let headings: Vec<_> = lines
            .iter()
            .filter_map(|l| match l {
                TotalsLine::Heading(c) => Some(*c),
                _ => None,
            })
            .collect();

        assert_eq!(headings, vec![Currency::Crc, Currency::Usd]);
        assert!(lines.contains(&TotalsLine::Total {
            label: "Total:".to_string(),
            value: "$113.00".to_string()
        }));
    }

    #[test]
    fn rendered_text_has_page_markers_and_header_on_each_page() {
        let p = proforma(vec![
            item(1, "A", dec!(1000), Currency::Crc),
            item(2, "B", dec!(1000), Currency::Crc),
        ]);

        let text = build(&p, &QuoteConfig::default()).render_text();
        let pages: Vec<&str> = text.split(PAGE_BREAK).collect();

        assert_eq!(pages.len(), 2);
        for page in &pages {
            assert!(page.contains("Cotización N°: PF-20250110-090000"));
            assert!(page.contains("PROFORMA - IMPLEMENTO"));
            assert!(page.contains("VIGENCIA: 15 días (hasta 2025-01-25)"));
        }
        assert!(pages[0].contains("CLIENTE: Finca La Esperanza"));
        assert!(!pages[1].contains("CLIENTE:"));
        assert!(!pages[0].contains("TOTALES"));
        assert!(pages[1].contains("TOTALES"));
        assert!(pages[1].contains("Página 2 de 2"));
    }

    #[test]
    fn rendered_lines_fit_page_width() {
        let mut long = item(1, "Modelo con nombre extremadamente largo", dec!(123456789), Currency::Usd);
        long.description = "palabra ".repeat(200);
        let p = proforma(vec![long]);

        let text = build(&p, &QuoteConfig::default()).render_text();

        for line in text.lines() {
            assert!(line.chars().count() <= PAGE_WIDTH, "too wide: {line}");
        }
    }
}
