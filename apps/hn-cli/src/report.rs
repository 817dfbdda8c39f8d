//! Flat CSV tables for command output.

use std::fmt::Write as _;

use hn_solver::Uncertainty;
use nalgebra::DVector;

/// `case,<labels>` header, then one row per named state.
pub fn state_table(labels: &[String], rows: &[(String, DVector<f64>)]) -> String {
    let mut csv = String::from("case");
    for label in labels {
        csv.push(',');
        csv.push_str(label);
    }
    csv.push('\n');
    for (name, x) in rows {
        csv.push_str(name);
        for v in x.iter() {
            let _ = write!(csv, ",{v}");
        }
        csv.push('\n');
    }
    csv
}

/// One row per unknown: converged value, linear deviation and standard
/// deviation.
pub fn uncertainty_table(labels: &[String], x: &DVector<f64>, unc: &Uncertainty) -> String {
    let mut csv = String::from("unknown,value,delta,std_dev\n");
    for (i, label) in labels.iter().enumerate() {
        let _ = writeln!(
            csv,
            "{label},{},{},{}",
            x[i], unc.delta[i], unc.std_dev[i]
        );
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn state_table_has_one_row_per_case() {
        let labels = vec!["a_T".to_string(), "b_T".to_string()];
        let rows = vec![
            ("base".to_string(), DVector::from_vec(vec![1.0, 2.5])),
            ("hot".to_string(), DVector::from_vec(vec![3.0, 4.0])),
        ];
        assert_eq!(
            state_table(&labels, &rows),
            "case,a_T,b_T\nbase,1,2.5\nhot,3,4\n"
        );
    }

    #[test]
    fn uncertainty_table_lists_each_unknown() {
        let labels = vec!["mid_T".to_string()];
        let unc = Uncertainty {
            delta: DVector::from_vec(vec![0.5]),
            covariance: DMatrix::from_element(1, 1, 0.25),
            std_dev: DVector::from_vec(vec![0.5]),
        };
        let csv = uncertainty_table(&labels, &DVector::from_vec(vec![5.0]), &unc);
        assert_eq!(csv, "unknown,value,delta,std_dev\nmid_T,5,0.5,0.5\n");
    }
}
