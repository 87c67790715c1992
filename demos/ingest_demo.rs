use financial_model_ingest::*;
use rust_xlsxwriter::Workbook;
use std::error::Error;
use tempfile::TempDir;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    println!("📊 Financial Model Ingestion Demo\n");
    println!("This demonstrates the full pipeline over a workbook with the");
    println!("problems real exports have: currency text where numbers belong,");
    println!("a division-by-zero marker, dates written as text.\n");

    let dir = TempDir::new()?;
    let path = dir.path().join("demo_model.xlsx");

    let mut workbook = Workbook::new();
    let pnl = workbook.add_worksheet().set_name("P&L Forecast")?;
    pnl.write_string(0, 0, "Line Item")?;
    pnl.write_string(0, 1, "2022")?;
    pnl.write_string(0, 2, "2023")?;
    pnl.write_string(0, 3, "2024")?;
    pnl.write_string(1, 0, "Revenue")?;
    pnl.write_string(1, 1, "$1,000.00")?;
    pnl.write_number(1, 2, 1200.0)?;
    pnl.write_number(1, 3, 1440.0)?;
    pnl.write_string(2, 0, "Operating Expenses")?;
    pnl.write_number(2, 1, 400.0)?;
    pnl.write_string(2, 2, "#DIV/0!")?;
    pnl.write_number(2, 3, 520.0)?;
    pnl.write_string(3, 0, "Report Date")?;
    pnl.write_string(3, 1, "2022-12-31")?;
    pnl.write_string(3, 2, "2023-12-31")?;
    pnl.write_string(3, 3, "2024-12-31")?;
    pnl.write_string(4, 0, "Net Income")?;
    pnl.write_formula(4, 1, "=B2-B3")?;
    pnl.write_formula(4, 2, "=C2-C3")?;
    pnl.write_formula(4, 3, "=D2-D3")?;
    workbook.save(&path)?;

    println!("📋 Workbook written to {:?}\n", path.file_name().unwrap());

    match ingest_workbook(&path) {
        Ok(report) => {
            println!("✅ Parsed {} sheet(s):", report.parsed.sheets.len());
            for sheet in &report.parsed.sheets {
                println!(
                    "   {} -> {:?} ({} cells, header row {:?})",
                    sheet.name,
                    sheet.sheet_type,
                    sheet.cells.len(),
                    sheet.header_row
                );
            }

            let summary = report.parsed.validation.as_ref().unwrap();
            println!("\n🔎 Structural validation: valid={}", summary.is_valid);
            for finding in &summary.errors {
                println!("   [{}] {}", finding.severity.as_str(), finding.message);
            }
            println!("   Template validation: valid={}", report.template.is_valid);
            for finding in &report.template.validation_errors {
                println!("   [{}] {}", finding.severity.as_str(), finding.message);
            }

            if let Some(repair) = &report.repair {
                println!(
                    "\n🔧 Repair: success={} with {} fix(es)",
                    repair.success,
                    repair.applied_fixes.len()
                );
                for fix in &repair.applied_fixes {
                    println!(
                        "   {:?} at {}!{} ({:?} -> {:?}, confidence {:.2})",
                        fix.kind,
                        fix.sheet,
                        fix.cell.as_deref().unwrap_or("<sheet>"),
                        fix.original,
                        fix.fixed,
                        fix.confidence
                    );
                }
                for recommendation in &repair.recommendations {
                    println!("   ⚠️  {}", recommendation);
                }
            } else {
                println!("\n🔧 Repair: not needed");
            }

            let effective = report.effective_workbook();
            let sheet = &effective.sheets[0];
            let detector = ParameterDetector::new();

            let revenue = detector.series_from_row(sheet, 1);
            let growth = detector.detect_growth_patterns(&revenue);
            println!("\n📈 Revenue growth:");
            println!("   rates: {:?}", growth.growth_rates);
            println!("   average: {:.4}", growth.average_growth_rate);

            let quarterly = [120.0, 180.0, 150.0, 310.0, 118.0, 176.0, 149.0, 308.0];
            let seasonality = detector.detect_seasonality(&quarterly);
            println!(
                "   seasonality over a quarterly sample: {:?} (periods {:?})",
                seasonality.has_seasonality, seasonality.seasonal_periods
            );

            let dependencies = parse_formula_dependencies("=B2-B3", &sheet.name);
            println!("   '=B2-B3' depends on {:?}", dependencies);

            println!("\n📦 Export for the API layer:");
            println!("{}", serde_json::to_string_pretty(&effective.export_to_dict())?);
        }
        Err(e) => {
            eprintln!("❌ Ingestion failed: {}", e);
        }
    }

    Ok(())
}
