use stairspeed_runner::prelude::*;

fn main() -> StairSpeedResult<()> {
    let cli = init();
    run(cli)?;

    Ok(())
}
