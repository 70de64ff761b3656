use courtside::client::Client;

#[test]
fn impl_std_error_trait() -> Result<(), Box<dyn std::error::Error>> {
    Client::new("http://api.dribbble.com", "MyProject/1.0")?;

    Ok(())
}
