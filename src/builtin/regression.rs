use super::Collaborator;
use crate::command::ExitCode;
use anyhow::{anyhow, bail, Result};
use argh::FromArgs;
use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

/// Pivots below this are treated as a singular system.
const EPSILON: f64 = 1e-12;

#[derive(FromArgs)]
/// Least-squares regression over "x y" pairs in a text file, plotted to
/// plot.png through gnuplot.
pub struct Regression {
    #[argh(positional)]
    /// data file with one "x y" pair per line
    pub file: String,

    #[argh(option, short = 'p')]
    /// fit a polynomial of this degree instead of a straight line
    pub degree: Option<usize>,
}

impl Collaborator for Regression {
    fn name() -> &'static str {
        "regression"
    }

    fn execute(self, stdout: &mut dyn Write) -> Result<ExitCode> {
        let contents =
            fs::read_to_string(&self.file).map_err(|e| anyhow!("{}: {e}", self.file))?;
        let points = parse_points(&contents);
        if points.is_empty() {
            bail!("{}: expected data not found", self.file);
        }

        writeln!(stdout, "Data Points:")?;
        writeln!(stdout, "x\t y")?;
        for (x, y) in &points {
            writeln!(stdout, "{x:.2}\t{y:.2}")?;
        }

        let coefficients = match self.degree {
            None => {
                let (intercept, slope) = linear_fit(&points)?;
                writeln!(stdout)?;
                writeln!(stdout, "Linear Regression Coefficients:")?;
                writeln!(stdout, "Coefficient a0: {intercept:.2}")?;
                writeln!(stdout, "Coefficient a1: {slope:.2}")?;
                vec![intercept, slope]
            }
            Some(degree) => {
                let coefficients = polynomial_fit(&points, degree)?;
                writeln!(stdout)?;
                writeln!(stdout, "Polynomial Regression Coefficients:")?;
                for (i, c) in coefficients.iter().enumerate() {
                    writeln!(stdout, "Coefficient a{i}: {c:.2}")?;
                }
                coefficients
            }
        };

        write_data_file("data.txt", &points)?;
        plot(&coefficients)?;
        Ok(0)
    }
}

/// Read "x y" pairs line by line, stopping at the first malformed line.
fn parse_points(contents: &str) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let pair = (
            fields.next().and_then(|f| f.parse::<f64>().ok()),
            fields.next().and_then(|f| f.parse::<f64>().ok()),
        );
        match pair {
            (Some(x), Some(y)) => points.push((x, y)),
            _ => break,
        }
    }
    points
}

/// Closed-form least squares; returns (intercept, slope).
fn linear_fit(points: &[(f64, f64)]) -> Result<(f64, f64)> {
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < EPSILON {
        bail!("regression is undefined for constant x values");
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Ok((intercept, slope))
}

/// Normal-equation fit solved by Gaussian elimination; returns a0..a<degree>.
fn polynomial_fit(points: &[(f64, f64)], degree: usize) -> Result<Vec<f64>> {
    let order = degree + 1;

    let mut matrix = vec![vec![0.0f64; order]; order];
    for (i, row) in matrix.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = points.iter().map(|(x, _)| x.powi((i + j) as i32)).sum();
        }
    }
    let mut rhs: Vec<f64> = (0..order)
        .map(|i| points.iter().map(|(x, y)| x.powi(i as i32) * y).sum())
        .collect();

    // Forward elimination.
    for i in 0..order {
        if matrix[i][i].abs() < EPSILON {
            bail!("polynomial system is singular; lower the degree");
        }
        for j in i + 1..order {
            let ratio = matrix[j][i] / matrix[i][i];
            for k in 0..order {
                matrix[j][k] -= ratio * matrix[i][k];
            }
            rhs[j] -= ratio * rhs[i];
        }
    }

    // Back substitution.
    let mut coefficients = vec![0.0f64; order];
    for i in (0..order).rev() {
        let mut value = rhs[i];
        for j in i + 1..order {
            value -= matrix[i][j] * coefficients[j];
        }
        coefficients[i] = value / matrix[i][i];
    }
    Ok(coefficients)
}

fn write_data_file(name: &str, points: &[(f64, f64)]) -> Result<()> {
    let mut out = String::new();
    for (x, y) in points {
        out.push_str(&format!("{x} {y}\n"));
    }
    fs::write(name, out).map_err(|e| anyhow!("{name}: {e}"))
}

/// Drive gnuplot with a script on stdin; produces plot.png next to data.txt.
fn plot(coefficients: &[f64]) -> Result<()> {
    let mut script = String::new();
    script.push_str("set terminal pngcairo enhanced font \"arial,10\" size 800,600\n");
    script.push_str("set output \"plot.png\"\n");
    script.push_str("set title \"Regression Plot\"\n");
    script.push_str("set xlabel \"X\"\n");
    script.push_str("set ylabel \"Y\"\n");
    script.push_str("plot \"data.txt\" with points title \"Data Points\", ");
    script.push_str(&curve_expression(coefficients));
    script.push_str("quit\n");

    let mut child = Command::new("gnuplot")
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| anyhow!("unable to run gnuplot: {e}"))?;
    child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("gnuplot stdin was not captured"))?
        .write_all(script.as_bytes())?;
    let status = child.wait()?;
    if !status.success() {
        bail!("gnuplot exited with {status}");
    }
    Ok(())
}

fn curve_expression(coefficients: &[f64]) -> String {
    match coefficients {
        [intercept, slope] => {
            format!("{slope}*x + {intercept} with lines title \"Linear Regression\"\n")
        }
        _ => {
            let mut expr = format!("{}", coefficients.first().copied().unwrap_or(0.0));
            for (i, c) in coefficients.iter().enumerate().skip(1) {
                expr.push_str(&format!(" + {c}*x**{i}"));
            }
            expr.push_str(" with lines title \"Polynomial Regression\"\n");
            expr
        }
    }
}
