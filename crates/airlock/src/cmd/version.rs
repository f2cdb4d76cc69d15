use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("airlock {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: airlock");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", option_env!("AIRLOCK_BUILD_TARGET").unwrap_or("unknown"));
    println!("profile: {}", option_env!("AIRLOCK_BUILD_PROFILE").unwrap_or("unknown"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "wire: msgpack, max_frame_size={}",
        airlock_wire::DEFAULT_MAX_FRAME_SIZE
    );

    Ok(SUCCESS)
}
