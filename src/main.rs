#[tokio::main]
async fn main() {
    if let Err(err) = activity_grader::run().await {
        eprintln!("activity-grader fatal: {err:#}");
        std::process::exit(1);
    }
}
