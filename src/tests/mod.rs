mod test_ground_irradiance;
