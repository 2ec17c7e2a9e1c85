// example/src/main.rs

mod generated {
    pub mod minibuf_types {
        include!(concat!(env!("OUT_DIR"), "/minibuf_types.rs"));
    }
    pub mod minibuf {
        include!(concat!(env!("OUT_DIR"), "/minibuf.rs"));
    }
}

use minibuf::WireError;

// Bring the generated types into scope:
use generated::minibuf_types::{Config, Point, Vector, FLOAT_PRECISION};

fn main() -> Result<(), WireError> {
    let vector = Vector { x: 1.234, y: 5.678, z: 9.101 };
    let config = Config {
        auto_restart: true,
        id: 42,
        user_name: "Ted Balkjfa".to_string(),
        score: 100.0,
    };

    let mut vector_buf = [0u8; 256];
    let len = vector.serialize(&mut vector_buf)?;
    let vector_text = std::str::from_utf8(&vector_buf[..len]).unwrap_or_default();
    let config_text = config.to_wire();

    println!("Serialized Vector: {}", vector_text);
    println!("Serialized Config: {}", config_text);

    let parsed_vector = Vector::parse(vector_text)?;
    let parsed_config = Config::parse(&config_text)?;
    println!(
        "Parsed Vector: x={}, y={}, z={} (precision {})",
        parsed_vector.x, parsed_vector.y, parsed_vector.z, FLOAT_PRECISION
    );
    println!(
        "Parsed Config: auto_restart={}, id={}, user_name={}, score={}",
        parsed_config.auto_restart, parsed_config.id, parsed_config.user_name, parsed_config.score
    );

    let point = Point::parse("[2]3")?;
    println!("Point from \"[2]3\": {:?} -> {}", point, point.to_wire());

    Ok(())
}
