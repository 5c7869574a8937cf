use anyhow::Result;
use tempfile::tempdir;

use datagov_pipeline::analysis::{AggregationSpec, MetricsComputer, NamedAggregation};
use datagov_pipeline::domain::{Table, Value};
use datagov_pipeline::infra::{read_csv, write_csv};

fn harvest() -> Table {
    let rows = [
        (2019.0, "Antioquia", Some(12.0), Some(3.0)),
        (2020.0, "Antioquia", Some(40.0), None),
        (2020.0, "Valle", Some(8.0), Some(1.0)),
        (2021.0, "Valle", Some(0.0), Some(2.0)),
        (2021.0, "Narino", None, Some(0.0)),
    ]
    .into_iter()
    .map(|(year, dept, production, area)| {
        vec![
            Value::from(year),
            Value::from(dept),
            Value::from(production),
            Value::from(area),
        ]
    })
    .collect();
    Table::from_rows(["año", "departamento", "producci_n_t", "area"], rows).unwrap()
}

#[test]
fn test_top_year_by_total_production_from_csv() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("harvest.csv");
    write_csv(&harvest(), &path)?;
    let table = read_csv(&path)?;

    let spec = AggregationSpec::new(
        ["año"],
        vec!["total=sum:producci_n_t".parse::<NamedAggregation>()?],
        "total",
    )
    .with_top_n(1);
    let top = MetricsComputer::new(&table).grouped_table(&spec)?;

    assert_eq!(top.columns(), &["año", "total"]);
    assert_eq!(top.rows()?, vec![vec![Value::from(2020.0), Value::from(48.0)]]);
    Ok(())
}

#[test]
fn test_profile_ratios_stay_within_bounds() -> Result<()> {
    let table = harvest();
    let profile = MetricsComputer::new(&table).profile(2)?;

    assert_eq!(profile.head.n_rows(), 2);
    assert_eq!(profile.info.rows, 5);
    assert_eq!(profile.duplicate_rows.n_rows(), 0);
    assert_eq!(profile.duplicate_rows.columns(), table.columns());
    for ratio in profile.missing_values.iter().chain(&profile.zero_values) {
        assert!((0.0..=100.0).contains(&ratio.percent), "{:?}", ratio);
    }

    let missing: Vec<String> = profile.missing_values.iter().map(|r| r.display()).collect();
    assert_eq!(missing, vec!["0.0%", "0.0%", "20.0%", "20.0%"]);

    let production = profile
        .describe
        .iter()
        .find(|s| s.column == "producci_n_t")
        .expect("numeric summary");
    assert_eq!(production.count, 4);
    assert_eq!(production.mean, Some(15.0));
    assert_eq!(production.max, Some(40.0));

    let unique: Vec<usize> = profile.unique_values.iter().map(|c| c.count).collect();
    assert_eq!(unique, vec![3, 3, 4, 4]);
    Ok(())
}

#[test]
fn test_mean_by_category_ranks_departments() -> Result<()> {
    let table = harvest();
    let means = MetricsComputer::new(&table).mean_by_category("departamento", "producci_n_t", 10)?;

    assert_eq!(means.columns(), &["departamento", "producci_n_t"]);
    let rows = means.rows()?;
    let departments: Vec<&Value> = rows.iter().map(|row| &row[0]).collect();
    assert_eq!(
        departments,
        vec![
            &Value::from("Antioquia"),
            &Value::from("Valle"),
            &Value::from("Narino")
        ]
    );
    assert_eq!(rows[0][1], Value::from(26.0));
    assert_eq!(rows[2][1], Value::Null);
    Ok(())
}
